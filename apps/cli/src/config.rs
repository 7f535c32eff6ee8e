//! CLI configuration loading and merging.

use marquee_core::MarqueeConfig;

/// Flag values that override every configuration file.
#[derive(Debug, Default)]
pub struct FlagOverrides {
    pub engine: Option<String>,
    pub model: Option<String>,
    pub log_level: Option<String>,
}

/// Load and merge CLI configuration.
///
/// Configuration precedence:
/// 1. CLI arguments
/// 2. Environment variables (`MARQUEE_ENGINE`, `MARQUEE_MODEL`)
/// 3. Local config file (./.marqueerc)
/// 4. Global config file (~/.marquee/config.toml)
/// 5. Defaults
pub fn load_config(flags: FlagOverrides) -> MarqueeConfig {
    let mut config = MarqueeConfig::discover_and_load();
    config.merge(&MarqueeConfig {
        engine: flags.engine,
        model: flags.model,
        log_level: flags.log_level,
        ..MarqueeConfig::default()
    });
    config
}
