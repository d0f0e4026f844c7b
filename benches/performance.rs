//! Performance benchmarks for target expansion, frame building and statistics

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use net_probe_engine::{
    models::ResultLabels,
    stats::TestStatistics,
    targets::{expand_addresses, expand_ports},
    transport::{build_ipv4_frame, build_ipv6_segment},
    Protocol,
};
use std::net::{Ipv4Addr, Ipv6Addr};

fn bench_target_expansion(c: &mut Criterion) {
    let mut group = c.benchmark_group("target_expansion");

    for prefix in [28u8, 24, 20, 16] {
        let spec = format!("10.0.0.0/{}", prefix);
        group.bench_with_input(BenchmarkId::new("ipv4_block", prefix), &spec, |b, spec| {
            b.iter(|| expand_addresses(black_box(spec)).unwrap())
        });
    }

    group.bench_function("overlapping_blocks", |b| {
        b.iter(|| expand_addresses(black_box("10.0.0.0/24,10.0.0.128/25,10.0.0.7,2001:db8::/120")).unwrap())
    });

    group.bench_function("port_ranges", |b| {
        b.iter(|| expand_ports(black_box("1-1024,8000-8100,443,80,5683")).unwrap())
    });

    group.finish();
}

fn bench_frames(c: &mut Criterion) {
    let payload = vec![0x40u8; 512];
    let v4_src = Ipv4Addr::new(192, 0, 2, 10);
    let v4_dst = Ipv4Addr::new(192, 0, 2, 1);
    let v6_src: Ipv6Addr = "2001:db8::10".parse().unwrap();
    let v6_dst: Ipv6Addr = "2001:db8::1".parse().unwrap();

    c.bench_function("build_ipv4_frame", |b| {
        b.iter(|| build_ipv4_frame(v4_src, 50000, v4_dst, 5683, black_box(&payload)).unwrap())
    });

    c.bench_function("build_ipv6_segment", |b| {
        b.iter(|| build_ipv6_segment(v6_src, 50000, v6_dst, 5683, black_box(&payload)).unwrap())
    });
}

fn bench_statistics(c: &mut Criterion) {
    let mut stats = TestStatistics::new();
    for i in 0..5_000u64 {
        let endpoint = format!("10.0.{}.{}:5683", i / 256, i % 256);
        stats.packets_sent += 1;
        if i % 3 == 0 {
            stats.packets_received += 1;
            stats.packets_rtt.push(i % 97);
            stats.add_active(Protocol::Coap, endpoint);
        } else {
            stats.add_inactive(Protocol::Coap, endpoint);
        }
    }
    let labels = ResultLabels::default();

    c.bench_function("statistics_report_5000", |b| {
        b.iter(|| black_box(stats.report("bench", &labels)))
    });
}

criterion_group!(benches, bench_target_expansion, bench_frames, bench_statistics);
criterion_main!(benches);
