/// Application name, used for cache and build directory names.
pub const APP_NAME: &str = "substrate";

/// Environment variable overriding the dependency cache root.
pub const CACHE_DIR_ENV: &str = "SUBSTRATE_CACHE_DIR";

/// Default project configuration file name.
pub const CONFIG_FILE: &str = "substrate.toml";

/// Buffer size used when streaming files through a digest.
pub const DIGEST_BUFFER_SIZE: usize = 8192;
