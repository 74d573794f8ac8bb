use std::hint::black_box;
use std::time::Duration;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use nfft_lsp::DirectNdft;
use nfft_lsp::LombScargle;
use nfft_lsp::LspConfig;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Distribution;
use rand_distr::Normal;

fn series(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
  let mut rng = StdRng::seed_from_u64(seed);
  let noise = Normal::new(0.0, 0.5).unwrap();
  let mut t = (0..n)
    .map(|_| rng.random::<f64>() * n as f64)
    .collect::<Vec<_>>();
  t.sort_by(|a, b| a.total_cmp(b));
  let y = t
    .iter()
    .map(|&ti| (2.0 * std::f64::consts::PI * 0.13 * ti).sin() + noise.sample(&mut rng))
    .collect();
  (t, y)
}

fn bench_cpu_by_size(c: &mut Criterion) {
  let mut group = c.benchmark_group("Periodogram/cpu");
  group.measurement_time(Duration::from_secs(3));
  let lsp = LombScargle::new(LspConfig::<f64>::default());

  for &n in &[256, 1024, 4096, 16384, 65536] {
    let (t, y) = series(n, n as u64);
    group.bench_with_input(BenchmarkId::new("nfft", n), &n, |b, _| {
      b.iter(|| black_box(lsp.compute(&t, &y).unwrap()));
    });
  }

  group.finish();
}

fn bench_cpu_vs_direct(c: &mut Criterion) {
  let mut group = c.benchmark_group("Periodogram/cpu_vs_direct");
  group.warm_up_time(Duration::from_millis(500));
  let cpu = LombScargle::new(LspConfig::<f64>::default());
  let direct = LombScargle::with_engine(LspConfig::<f64>::default(), DirectNdft);

  for &n in &[128, 512, 2048] {
    let (t, y) = series(n, 7 + n as u64);
    group.bench_with_input(BenchmarkId::new("nfft", n), &n, |b, _| {
      b.iter(|| black_box(cpu.compute(&t, &y).unwrap()));
    });
    group.bench_with_input(BenchmarkId::new("direct", n), &n, |b, _| {
      b.iter(|| black_box(direct.compute(&t, &y).unwrap()));
    });
  }

  group.finish();
}

fn bench_f32_vs_f64(c: &mut Criterion) {
  let mut group = c.benchmark_group("Periodogram/precision");
  let n = 8192;
  let (t, y) = series(n, 11);
  let t32 = t.iter().map(|&v| v as f32).collect::<Vec<_>>();
  let y32 = y.iter().map(|&v| v as f32).collect::<Vec<_>>();
  let lsp64 = LombScargle::new(LspConfig::<f64>::default());
  let lsp32 = LombScargle::new(LspConfig::<f32>::default());

  group.bench_function("f64", |b| b.iter(|| black_box(lsp64.compute(&t, &y).unwrap())));
  group.bench_function("f32", |b| b.iter(|| black_box(lsp32.compute(&t32, &y32).unwrap())));

  group.finish();
}

criterion_group!(benches, bench_cpu_by_size, bench_cpu_vs_direct, bench_f32_vs_f64);
criterion_main!(benches);
