use anyhow::{Context, bail};
use clap::Parser;
use optipack::{DEFAULT_SIZES, PacketSize};
use std::net::SocketAddr;

/// Command-line arguments, each overridable via the environment.
#[derive(Debug, Parser)]
#[command(name = "optipack-http-server", version, about)]
pub struct CliArgs {
    /// Address to bind, e.g. `0.0.0.0:8080`.
    #[arg(long, env = "PACKER_SERVER_ADDR", default_value = "0.0.0.0:8080")]
    pub server_addr: String,

    /// Comma-separated packet sizes the service starts with. Defaults to
    /// 250,500,1000,2000,5000 when omitted.
    #[arg(long, env = "PACKER_SIZES", value_delimiter = ',')]
    pub sizes: Vec<PacketSize>,

    /// Maximum number of calculation results kept per catalog version.
    #[arg(long, env = "PACKER_CACHE_CAPACITY", default_value_t = 10_000)]
    pub cache_capacity: usize,
}

/// Validated runtime configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub server_addr: String,
    pub sizes: Vec<PacketSize>,
    pub cache_capacity: usize,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        args.server_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid server address: {}", args.server_addr))?;

        if args.cache_capacity == 0 {
            bail!("cache capacity must be at least 1");
        }

        let sizes = if args.sizes.is_empty() {
            DEFAULT_SIZES.to_vec()
        } else {
            args.sizes
        };

        Ok(Self {
            server_addr: args.server_addr,
            sizes,
            cache_capacity: args.cache_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("optipack-http-server").chain(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_fill_in_the_standard_catalog() {
        let config = ServerConfig::try_from(args(&[])).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:8080");
        assert_eq!(config.sizes, DEFAULT_SIZES.to_vec());
        assert_eq!(config.cache_capacity, 10_000);
    }

    #[test]
    fn sizes_are_comma_separated() {
        let config = ServerConfig::try_from(args(&["--sizes", "23,31,53"])).unwrap();
        assert_eq!(config.sizes, vec![23, 31, 53]);
    }

    #[test]
    fn rejects_an_unparseable_address() {
        assert!(ServerConfig::try_from(args(&["--server-addr", "not-an-addr"])).is_err());
    }

    #[test]
    fn rejects_a_zero_cache_capacity() {
        assert!(ServerConfig::try_from(args(&["--cache-capacity", "0"])).is_err());
    }
}
