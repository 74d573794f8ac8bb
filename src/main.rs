use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::ensure;
use anyhow::Context;
use anyhow::Result;
use nfft_lsp::LombScargle;
use nfft_lsp::LspConfig;
use nfft_lsp::LspFlags;
use nfft_lsp::PeakSearchConfig;
use nfft_lsp::PeriodogramPlotter;
use prettytable::row;
use prettytable::Table;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: nfft-lsp <data-file> [oversampling] [hifac] [--peaks N] [--html PATH] [--timing]";

#[derive(Debug)]
struct Args {
  input: PathBuf,
  oversampling: f64,
  hifac: f64,
  top_k: usize,
  html: Option<PathBuf>,
  timing: bool,
}

/// `None` when only the usage text was asked for.
fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Option<Args>> {
  let mut positional = Vec::new();
  let mut html = None;
  let mut top_k = 5;
  let mut timing = false;

  let mut it = args.into_iter();
  while let Some(arg) = it.next() {
    match arg.as_str() {
      "--html" => html = Some(PathBuf::from(it.next().context("--html needs a path")?)),
      "--peaks" => {
        let n = it.next().context("--peaks needs a count")?;
        top_k = n.parse().with_context(|| format!("invalid peak count '{n}'"))?;
      }
      "--timing" => timing = true,
      "-h" | "--help" => return Ok(None),
      _ => positional.push(arg),
    }
  }

  ensure!(
    (1..=3).contains(&positional.len()),
    "expected 1 to 3 positional arguments\n{USAGE}"
  );
  let number = |idx: usize, name: &str, default: f64| -> Result<f64> {
    match positional.get(idx) {
      Some(s) => s.parse().with_context(|| format!("invalid {name} '{s}'")),
      None => Ok(default),
    }
  };

  Ok(Some(Args {
    input: PathBuf::from(&positional[0]),
    oversampling: number(1, "oversampling", 4.0)?,
    hifac: number(2, "hifac", 1.0)?,
    top_k,
    html,
    timing,
  }))
}

/// Reads `time value` pairs, skipping blank lines and `#` comments.
fn read_series(path: &Path) -> Result<(Vec<f64>, Vec<f64>)> {
  let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
  let reader = BufReader::new(file);
  let mut times = Vec::new();
  let mut values = Vec::new();

  for (lineno, line) in reader.lines().enumerate() {
    let line = line?;
    let line = line.split('#').next().unwrap_or("").trim();
    if line.is_empty() {
      continue;
    }
    let mut cols = line.split_whitespace();
    let (Some(t), Some(y)) = (cols.next(), cols.next()) else {
      bail!("{}:{}: expected two columns", path.display(), lineno + 1);
    };
    times.push(
      t.parse::<f64>()
        .with_context(|| format!("{}:{}: bad time '{t}'", path.display(), lineno + 1))?,
    );
    values.push(
      y.parse::<f64>()
        .with_context(|| format!("{}:{}: bad value '{y}'", path.display(), lineno + 1))?,
    );
  }

  Ok((times, values))
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let Some(args) = parse_args(std::env::args().skip(1))? else {
    println!("{USAGE}");
    return Ok(());
  };
  let (times, values) = read_series(&args.input)?;
  info!(path = %args.input.display(), samples = times.len(), "read series");

  let cfg = LspConfig {
    oversampling: args.oversampling,
    hifac: args.hifac,
    flags: LspFlags::default().with_timing(args.timing),
    ..LspConfig::default()
  };
  let pg = LombScargle::new(cfg).compute(&times, &values)?;
  info!(
    ng = pg.ng(),
    resolution = pg.resolution(),
    "periodogram computed"
  );

  let mut table = Table::new();
  table.add_row(row!["#", "frequency", "period", "power", "FAP"]);
  let peaks = pg.peaks(PeakSearchConfig {
    top_k: args.top_k,
    ..PeakSearchConfig::default()
  });
  for (rank, peak) in peaks.iter().enumerate() {
    let fap = peak
      .false_alarm_probability
      .map_or_else(|| "n/a".to_string(), |p| format!("{p:.3e}"));
    table.add_row(row![
      rank + 1,
      format!("{:.6}", peak.frequency),
      format!("{:.4}", peak.period),
      format!("{:.4}", peak.power),
      fap
    ]);
  }
  table.printstd();

  if let Some(path) = &args.html {
    PeriodogramPlotter::new()
      .title(&format!("Lomb-Scargle periodogram of {}", args.input.display()))
      .fap_levels(&[0.01, 0.1])
      .write_html(&pg, path)?;
    info!(path = %path.display(), "wrote plot");
  }

  Ok(())
}
