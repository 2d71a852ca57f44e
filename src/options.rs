use clap::Parser;

/// UVR Bridge - polls a UVR1611/UVR61-3 data logger and forwards the readings
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read
    #[clap(short = 'c', long = "config", default_value = "config.yaml")]
    pub config_file: String,

    /// Optional runtime limit in seconds
    #[clap(short = 't', long = "time")]
    pub runtime: Option<u64>,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_and_runtime() {
        let options = Options::parse_from(["uvr-bridge", "-c", "/etc/uvr.yaml", "-t", "60"]);

        assert_eq!(options.config_file, "/etc/uvr.yaml");
        assert_eq!(options.runtime, Some(60));
    }

    #[test]
    fn defaults_to_config_yaml() {
        let options = Options::parse_from(["uvr-bridge"]);

        assert_eq!(options.config_file, "config.yaml");
        assert_eq!(options.runtime, None);
    }
}
