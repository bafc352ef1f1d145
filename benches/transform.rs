use std::fs::File;
use std::io::Write;
use std::path::Path;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use orders_etl::config::EtlConfig;
use orders_etl::pipeline::{self, PipelineOptions};
use tempfile::TempDir;

fn generate_inputs(orders: usize, users: usize) -> TempDir {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let raw = temp_dir.path().join("data").join("raw");
    std::fs::create_dir_all(&raw).expect("raw dir");
    write_orders(&raw.join("orders.csv"), orders, users);
    write_users(&raw.join("users.csv"), users);
    temp_dir
}

fn write_orders(path: &Path, rows: usize, users: usize) {
    let mut file = File::create(path).expect("create orders");
    writeln!(file, "order_id,user_id,amount,quantity,created_at,status").expect("header");
    for i in 0..rows {
        let status = match i % 4 {
            0 => " Paid",
            1 => "REFUNDED",
            2 => "refund",
            _ => "paid ",
        };
        let amount = if i % 97 == 0 {
            "NA".to_string()
        } else {
            format!("{:.2}", (i % 500) as f64 * 1.37)
        };
        let day = (i % 28) + 1;
        let hour = i % 24;
        writeln!(
            file,
            "o{i},u{},{amount},{},2024-02-{day:02}T{hour:02}:15:00Z,{status}",
            i % (users + 10),
            (i % 5) + 1
        )
        .expect("row");
    }
}

fn write_users(path: &Path, rows: usize) {
    let mut file = File::create(path).expect("create users");
    writeln!(file, "user_id,country,signup_date").expect("header");
    for i in 0..rows {
        let country = ["US", "DE", "FR", "BR"][i % 4];
        writeln!(file, "u{i},{country},2023-01-{:02}", (i % 28) + 1).expect("row");
    }
}

fn bench_transform(c: &mut Criterion) {
    let temp_dir = generate_inputs(50_000, 2_000);
    let config = EtlConfig::from_root(temp_dir.path());
    let options = PipelineOptions::default();
    let (orders, users) = pipeline::load_inputs(&config, &options.csv).expect("load inputs");

    let mut group = c.benchmark_group("pipeline");

    group.bench_function("transform_50k_orders", |b| {
        b.iter_batched(
            || (),
            |_| {
                pipeline::transform(&orders, &users, &options).expect("transform");
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("run_etl_50k_orders", |b| {
        b.iter_batched(
            || (),
            |_| {
                pipeline::run_etl(&config, &options).expect("run etl");
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
    drop(temp_dir);
}

criterion_group!(benches, bench_transform);
criterion_main!(benches);
