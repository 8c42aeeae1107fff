use anyhow::Result;

use wordcap::config::Config;

pub fn cmd_styles(config: &Config, json: bool) -> Result<()> {
    let registry = config.registry()?;

    if json {
        let presets: std::collections::BTreeMap<_, _> = registry.iter().collect();
        println!("{}", serde_json::to_string_pretty(&presets)?);
        return Ok(());
    }

    let default = config.style_name();
    for (name, style) in registry.iter() {
        let marker = if name == default { "*" } else { " " };
        println!(
            "{marker} {name:<12} {:>3}px  {}  {} line(s)  anchor {:.2}",
            style.pixel_size,
            style.segmentation_method,
            style.max_lines,
            style.vertical_anchor_fraction,
        );
    }
    Ok(())
}
