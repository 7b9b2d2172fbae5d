pub mod assemble;
pub mod cli;
pub mod config;
pub mod datetime;
pub mod error;
pub mod model;
pub mod partition;
pub mod pipeline;
pub mod render;
pub mod source;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::cli::{
  Command,
  ShowArgs,
  SourceArgs
};
use crate::config::Config;
use crate::model::{
  QueryParams,
  ViewType
};
use crate::render::Renderer;
use crate::source::{
  CalendarSource,
  FileSource,
  HttpSource,
  LoggingSource
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting vacal"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = Config::load(
    cli.vacalrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let renderer =
    Renderer::new(cfg.color()?);

  match cli.command.unwrap_or_else(
    || Command::Show(ShowArgs::default())
  ) {
    | Command::Show(args) => {
      show(&cfg, &renderer, args)?
    }
    | Command::Countries(args) => {
      let source =
        build_source(&cfg, &args)?;
      let countries = source
        .fetch_countries()
        .context(
          "failed to load countries"
        )?;
      renderer.print_lines(countries)?;
    }
    | Command::Timezones => {
      renderer.print_lines(
        datetime::SUGGESTED_TIMEZONES
      )?;
    }
  }

  info!("done");
  Ok(())
}

fn show(
  cfg: &Config,
  renderer: &Renderer,
  args: ShowArgs
) -> anyhow::Result<()> {
  let params =
    query_params(cfg, &args)?;
  let source =
    build_source(cfg, &args.source)?;

  let retries = match args.retries {
    | Some(n) => n,
    | None => cfg.api_retries()?
  };

  let country =
    pipeline::choose_country(
      source.as_ref(),
      &params.country,
      retries
    );
  let params =
    params.with_country(country);

  let (data, view) =
    pipeline::load_view(
      source.as_ref(),
      &params,
      retries
    )
    .context(
      "failed to load calendar data"
    )?;

  if args.json {
    renderer.print_json(&data, &view)
  } else {
    renderer.print_calendar(&data, &view)
  }
}

/// Builds the immutable request value from flags, falling back to config.
pub fn query_params(
  cfg: &Config,
  args: &ShowArgs
) -> anyhow::Result<QueryParams> {
  let view = match &args.view {
    | Some(raw) => {
      raw.parse::<ViewType>()?
    }
    | None => cfg.default_view()?
  };

  let time_zone = match &args.time_zone
  {
    | Some(raw) => {
      datetime::parse_timezone(raw)?
    }
    | None => datetime::resolve_timezone(
      cfg
        .get("default.timezone")
        .as_deref()
    )
  };

  let start_date = match &args.start {
    | Some(raw) => {
      datetime::parse_calendar_date(raw)?
    }
    | None => {
      datetime::today_in(time_zone)
    }
  };

  let country = args
    .country
    .clone()
    .or_else(|| {
      cfg.get("default.country")
    })
    .unwrap_or_else(|| {
      "USA".to_string()
    });

  Ok(QueryParams {
    view,
    start_date,
    country,
    time_zone
  })
}

fn build_source(
  cfg: &Config,
  args: &SourceArgs
) -> anyhow::Result<
  Box<dyn CalendarSource>
> {
  let holidays = args
    .holidays
    .clone()
    .or_else(|| cfg.holidays_file());

  if let Some(path) = holidays {
    info!(file = %path.display(), "using local holiday file");
    return Ok(Box::new(
      LoggingSource::new(
        FileSource::new(
          &path,
          cfg.week_start()?
        )
      )
    ));
  }

  let url = args
    .api_url
    .clone()
    .unwrap_or_else(|| cfg.api_url());
  info!(url = %url, "using calendar backend");
  Ok(Box::new(LoggingSource::new(
    HttpSource::new(
      &url,
      cfg.api_timeout()?
    )?
  )))
}
