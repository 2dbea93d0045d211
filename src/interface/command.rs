use std::{path::PathBuf, process::ExitCode};

#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tracing::{Instrument, Level};

#[cfg(feature = "console-report")]
use crate::interface::report::{console::ConsoleReport, ReportWriter};
use crate::{
    error::DispatchError,
    grpc::{DescriptorSource, EncodeLayer, GrpcClient},
    invoke::{Orchestrator, RunReport, Settings, SuiteReport},
    measure::TraceLayer,
};

use super::config::{Config, Suite};

#[cfg(feature = "cli")]
pub async fn execute() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    let cmd = GrpcChain::parse();
    if cmd.init {
        Config::write_sample(&cmd.config)?;
        println!("sample configuration is written to {}", cmd.config.display());
        return Ok(ExitCode::SUCCESS);
    }

    let config = match Config::read(&cmd.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };
    tracing_subscriber::fmt().with_max_level(cmd.level(&config)).with_ansi(!cmd.no_color).init();

    let report = cmd.run(&config).await;
    cmd.report(&report)?;
    Ok(cmd.exit_code(&report))
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", clap(version, about))]
pub struct GrpcChain {
    /// config file of suites
    #[cfg_attr(feature = "cli", arg(short, long, default_value = "invoke.toml"))]
    pub config: PathBuf,

    /// write a sample config to the config path and exit
    #[cfg_attr(feature = "cli", arg(long))]
    pub init: bool,

    /// do not log request data
    #[cfg_attr(feature = "cli", arg(long))]
    pub silence: bool,

    /// echo each request as a curl command
    #[cfg_attr(feature = "cli", arg(long))]
    pub curl: bool,

    /// max log level, overrides `log-level` of suites
    #[cfg_attr(feature = "cli", arg(long))]
    pub log_level: Option<String>,

    /// fail when any dispatch failed, any verification failed or any suite was unreachable
    #[cfg_attr(feature = "cli", arg(long))]
    pub strict: bool,

    /// without colorize output
    #[cfg_attr(feature = "cli", arg(long))]
    pub no_color: bool,
}

impl GrpcChain {
    /// `--log-level`, otherwise the most verbose level among enabled suites, otherwise debug.
    pub fn level(&self, config: &Config) -> Level {
        let parse = |text: &str| match text.parse::<Level>() {
            Ok(level) => Some(level),
            Err(_) => {
                eprintln!("`{}` is not a log level, debug is used", text);
                Some(Level::DEBUG)
            }
        };
        match &self.log_level {
            Some(level) => parse(level.as_str()),
            None => config.enabled().filter_map(|(_, suite)| suite.log_level.as_deref()).filter_map(parse).max(),
        }
        .unwrap_or(Level::DEBUG)
    }

    pub fn settings(&self, address: &str) -> Settings {
        Settings { silence: self.silence, curl: self.curl, address: address.to_string() }
    }

    /// Run enabled suites one after another.
    pub async fn run(&self, config: &Config) -> RunReport {
        let mut suites = Vec::new();
        for (name, suite) in config.enabled() {
            let span = tracing::info_span!("suite", name = name.as_str());
            suites.push(self.run_suite(name, suite).instrument(span).await);
        }
        RunReport { suites }
    }

    async fn run_suite(&self, name: &str, suite: &Suite) -> SuiteReport {
        let address = suite.target.address.clone();
        let (client, source) = match self.connect(suite).await {
            Ok(connected) => connected,
            Err(e) => {
                tracing::error!(address = address.as_str(), error = %e, "cannot connect");
                return SuiteReport { name: name.to_string(), address, unreachable: true, invocations: Vec::new() };
            }
        };

        let service = ServiceBuilder::new().layer(EncodeLayer::new(source)).layer(TraceLayer).service(client);
        let orchestrator = Orchestrator::new(service, suite.target.contexts(), self.settings(&address));
        let invocations = orchestrator.run(&suite.invokes).await;
        SuiteReport { name: name.to_string(), address, unreachable: false, invocations }
    }

    async fn connect(&self, suite: &Suite) -> Result<(GrpcClient, DescriptorSource), DispatchError> {
        let source = suite.target.descriptor_source()?;
        let client = GrpcClient::connect(&suite.target.address, suite.target.keepalive).await?;
        Ok((client, source))
    }

    pub fn report(&self, report: &RunReport) -> Result<(), std::fmt::Error> {
        self.report_with(report, std::io::stdout())
    }
    pub fn report_with<W: std::io::Write>(&self, report: &RunReport, write: W) -> Result<(), std::fmt::Error> {
        #[cfg(feature = "console-report")]
        {
            console::set_colors_enabled(!self.no_color);
            report.console_report(&mut ReportWriter::new(0, write))?;
        }
        #[cfg(not(feature = "console-report"))]
        let _ = (report, write);
        Ok(())
    }

    /// Only a strict run fails on failed dispatches, mismatches or unreachable suites.
    pub fn allow(&self, report: &RunReport) -> bool {
        !(self.strict && report.is_dirty())
    }
    pub fn exit_code(&self, report: &RunReport) -> ExitCode {
        if self.allow(report) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::{
        interface::config::Format,
        invoke::{InvocationReport, Tally},
    };

    #[test]
    #[cfg(feature = "cli")]
    fn test_parse_args() {
        let cmd = GrpcChain::try_parse_from(["grpc-chain"]).unwrap();
        assert_eq!(cmd, GrpcChain { config: PathBuf::from("invoke.toml"), ..Default::default() });

        let cmd = GrpcChain::try_parse_from(["grpc-chain", "-c", "suites.yaml", "--curl", "--strict"]).unwrap();
        assert_eq!(
            cmd,
            GrpcChain { config: PathBuf::from("suites.yaml"), curl: true, strict: true, ..Default::default() }
        );
    }

    #[test]
    #[cfg(feature = "toml")]
    fn test_log_level() {
        let content = indoc! {r#"
            [a]
            log-level = "info"
            [a.target]
            address = "localhost:50051"

            [b]
            log-level = "trace"
            enabled = false
            [b.target]
            address = "localhost:50052"

            [c]
            log-level = "warn"
            [c.target]
            address = "localhost:50053"
        "#};
        let config = Config::read_str(content, Format::Toml).unwrap();
        assert_eq!(GrpcChain::default().level(&config), Level::INFO);
        assert_eq!(GrpcChain { log_level: Some("error".to_string()), ..Default::default() }.level(&config), Level::ERROR);
        assert_eq!(GrpcChain { log_level: Some("loud".to_string()), ..Default::default() }.level(&config), Level::DEBUG);
        assert_eq!(GrpcChain::default().level(&Config::default()), Level::DEBUG);
    }

    #[test]
    fn test_allow() {
        let dirty = RunReport {
            suites: vec![SuiteReport {
                invocations: vec![InvocationReport {
                    tally: Tally { dispatched: 1, failed: 0, mismatches: 1 },
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };
        assert!(GrpcChain::default().allow(&dirty));
        assert!(!GrpcChain { strict: true, ..Default::default() }.allow(&dirty));
        assert!(GrpcChain { strict: true, ..Default::default() }.allow(&RunReport::default()));
    }

    #[tokio::test]
    #[cfg(feature = "toml")]
    async fn test_unreachable_suite() {
        let content = indoc! {r#"
            [greeter.target]
            address = "127.0.0.1:1"

            [[greeter.invokes]]
            method = "helloworld.Greeter/SayHello"
        "#};
        let config = Config::read_str(content, Format::Toml).unwrap();
        let report = GrpcChain::default().run(&config).await;
        assert_eq!(report.unreachable(), 1);
        assert!(report.suites[0].invocations.is_empty());
    }
}
