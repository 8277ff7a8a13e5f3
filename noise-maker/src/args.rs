use clap::{Parser, ValueEnum, builder::RangedU64ValueParser};
use derive_getters::Getters;

#[derive(Parser, Debug, Getters)]
#[command(name = "noise-maker")]
#[command(about = "Publish synthetic access-log lines to NATS", long_about = None)]
pub struct CliArgs {
    #[arg(long, default_value = "nats://127.0.0.1:4222")]
    nats_url: String,

    #[arg(long, default_value = "logs")]
    subject: String,

    /// Lines per second.
    #[arg(long, default_value_t = 10)]
    rate: u64,

    #[arg(
        long,
        default_value_t = 100,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    batch_size: usize,

    #[arg(long, value_enum, default_value_t = LogFormat::Gateway)]
    format: LogFormat,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Client and upstream addresses, hostname, upstream time and status.
    Gateway,
    /// Client address, request line and status only.
    Minimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_must_be_positive() {
        assert!(CliArgs::try_parse_from(["noise-maker", "--batch-size", "0"]).is_err());
        let args = CliArgs::try_parse_from(["noise-maker", "--batch-size", "1"]).unwrap();
        assert_eq!(*args.batch_size(), 1);
    }
}
