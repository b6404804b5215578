use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use argh::FromArgs;
use exitcode::ExitCode;
use prometheus_ali_sd::config::{Config, Error as ConfigError, TagFilter};
use prometheus_ali_sd::discovery;
use tracing::{error, info};

#[derive(Debug, FromArgs)]
#[argh(
    subcommand,
    name = "ecs",
    description = "Discover ECS instances and write them as a Prometheus file_sd document",
    help_triggers("-h", "--help")
)]
pub struct Ecs {
    #[argh(option, short = 'o', description = "output file, default /tmp/test.json")]
    output: Option<PathBuf>,

    #[argh(
        option,
        short = 'l',
        description = "prefix of the labels derived from tags and of the vpc label"
    )]
    label_prefix: Option<String>,

    #[argh(option, description = "same as --label-prefix")]
    labelprefix: Option<String>,

    #[argh(option, short = 'n', description = "only list instances with this name")]
    instance_name: Option<String>,

    #[argh(option, description = "same as --instance-name")]
    instancename: Option<String>,

    #[argh(option, short = 's', description = "page size of API requests, 1 to 100")]
    page_size: Option<u32>,

    #[argh(option, description = "same as --page-size")]
    pagesize: Option<u32>,

    #[argh(
        option,
        short = 't',
        description = "only list instances with this tag, key=value, repeatable or comma separated"
    )]
    tag: Vec<String>,

    #[argh(
        option,
        description = "instance name regex, an instance must match one of them, repeatable or comma separated"
    )]
    regname: Vec<String>,

    #[argh(
        option,
        description = "drop instances which have a tag key matching this regex, repeatable or comma separated"
    )]
    notagk: Vec<String>,

    #[argh(
        option,
        description = "drop instances which have a tag value matching this regex, repeatable or comma separated"
    )]
    notagv: Vec<String>,

    #[argh(option, description = "domain appended to instance names, default ali-netbase.com")]
    domain_suffix: Option<String>,

    #[argh(option, description = "exporter port of the targets, default 9100")]
    port: Option<u16>,

    #[argh(option, description = "log level, overrides the one given before the command")]
    loglevel: Option<String>,

    #[argh(
        option,
        description = "append logs to this file, overrides the one given before the command"
    )]
    logfile: Option<PathBuf>,
}

/// `-t a=b,c=d -t e=f` is the same as `-t a=b -t c=d -t e=f`
fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .collect()
}

impl Ecs {
    pub fn log_level(&self) -> Option<&str> {
        self.loglevel.as_deref()
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.logfile.as_deref()
    }

    /// Flags take precedence over the config file, list flags replace the
    /// lists of the config file entirely. The dashed spelling of a flag wins
    /// over the undashed one.
    fn merge(&self, config: &mut Config) -> Result<(), ConfigError> {
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(label_prefix) = self.label_prefix.as_ref().or(self.labelprefix.as_ref()) {
            config.label_prefix = label_prefix.clone();
        }
        if let Some(instance_name) = self.instance_name.as_ref().or(self.instancename.as_ref()) {
            config.instance_name = Some(instance_name.clone());
        }
        if let Some(page_size) = self.page_size.or(self.pagesize) {
            config.page_size =
                NonZeroU32::new(page_size).ok_or(ConfigError::PageSize(page_size))?;
        }

        let tags = split_list(&self.tag);
        if !tags.is_empty() {
            config.tags = tags
                .iter()
                .map(|tag| tag.parse::<TagFilter>())
                .collect::<Result<Vec<_>, _>>()?;
        }

        let regname = split_list(&self.regname);
        if !regname.is_empty() {
            config.include_names = regname;
        }
        let notagk = split_list(&self.notagk);
        if !notagk.is_empty() {
            config.exclude_tag_keys = notagk;
        }
        let notagv = split_list(&self.notagv);
        if !notagv.is_empty() {
            config.exclude_tag_values = notagv;
        }

        if let Some(domain_suffix) = &self.domain_suffix {
            config.domain_suffix = domain_suffix.clone();
        }
        if let Some(port) = self.port {
            config.exporter_port = port;
        }

        config.validate()
    }

    pub fn run(&self, mut config: Config) -> Result<(), ExitCode> {
        let credentials = self
            .merge(&mut config)
            .and_then(|_| config.credentials())
            .map_err(|err| {
                error!(message = "invalid configuration", %err);
                err.exit_code()
            })?;

        let mut client = aliyun::Client::new(credentials).map_err(|err| {
            error!(message = "create aliyun client failed", %err);
            exitcode::SOFTWARE
        })?;
        if let Some(endpoint) = &config.aliyun.ecs_endpoint {
            client.set_endpoint(aliyun::Product::Ecs, endpoint.as_str());
        }
        if let Some(endpoint) = &config.aliyun.vpc_endpoint {
            client.set_endpoint(aliyun::Product::Vpc, endpoint.as_str());
        }

        info!(
            message = "start ecs discovery",
            region = client.region_id(),
            output = ?config.output,
            page_size = config.page_size.get(),
        );

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()
            .map_err(|err| {
                error!(message = "build tokio runtime failed", %err);
                exitcode::OSERR
            })?;

        runtime
            .block_on(discovery::run(&config, &client, &client))
            .map(|_summary| ())
            .map_err(|err| {
                error!(message = "ecs discovery failed", %err);
                err.exit_code()
            })
    }
}
