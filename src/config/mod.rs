mod settings;

pub use settings::{
    generate_default_config, DetectionDefaults, RateLimitSettings, RenderSettings, ServerSettings,
    Settings, StoreSettings,
};
