#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Configuration for the Taiko L2 chain syncer.

use clap::{
    Parser,
    builder::{
        Styles,
        styling::{AnsiColor, Color, Style},
    },
};

mod chain;
pub use chain::{ContractAddresses, L1Opts, L2Opts};

mod sync;
pub use sync::SyncOpts;

mod telemetry;
pub use telemetry::{LogProvider, TelemetryOpts};

/// CLI options for the Taiko L2 chain syncer.
#[derive(Debug, Clone, Parser)]
#[command(author, version, styles = cli_styles(), about)]
pub struct Opts {
    /// A unique name for this syncer instance, used in metrics and logs
    #[clap(long, env = "SYNCER_INSTANCE_NAME", default_value = "syncer")]
    pub instance_name: String,
    /// L1-related configuration options
    #[clap(flatten)]
    pub l1: L1Opts,
    /// L2-related configuration options
    #[clap(flatten)]
    pub l2: L2Opts,
    /// The contract addresses required to run the syncer.
    #[clap(flatten)]
    pub contracts: ContractAddresses,
    /// Sync-related configuration options
    #[clap(flatten)]
    pub sync: SyncOpts,
    /// Telemetry-related configuration options
    #[clap(flatten)]
    pub telemetry: TelemetryOpts,
}

/// Styles for the CLI.
const fn cli_styles() -> Styles {
    Styles::styled()
        .usage(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
        .header(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
        .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .invalid(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .error(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .valid(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::White))))
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::Opts;

    #[test]
    fn test_verify_cli() {
        Opts::command().debug_assert()
    }

    #[test]
    fn parses_minimal_args() {
        let opts = Opts::try_parse_from([
            "syncer",
            "--l1.el-url",
            "http://localhost:8545",
            "--l1.el-ws-url",
            "ws://localhost:8546",
            "--l2.el-url",
            "http://localhost:28545",
            "--l2.el-ws-url",
            "ws://localhost:28546",
            "--l2.engine-url",
            "http://localhost:28551",
            "--l2.jwt-secret",
            "0x0000000000000000000000000000000000000000000000000000000000000001",
            "--contracts.taiko-l1",
            "0x0000000000000000000000000000000000000001",
            "--contracts.taiko-l2",
            "0x1670000000000000000000000000000000010001",
        ])
        .unwrap();

        assert_eq!(opts.instance_name, "syncer");
        assert!(opts.l2.checkpoint_url.is_none());
        assert_eq!(opts.sync.epoch_size, 1000);
    }
}
