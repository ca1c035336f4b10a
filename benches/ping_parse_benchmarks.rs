use criterion::{black_box, criterion_group, criterion_main, Criterion};
use netpulse::logging::LogTemplate;
use netpulse::probes::latency::parse_round_trip_ms;

const LINUX_REPLY: &str = "PING 192.168.1.1 (192.168.1.1) 56(84) bytes of data.\n\
64 bytes from 192.168.1.1: icmp_seq=1 ttl=64 time=0.812 ms\n\
\n\
--- 192.168.1.1 ping statistics ---\n\
1 packets transmitted, 1 received, 0% packet loss, time 0ms\n\
rtt min/avg/max/mdev = 0.812/0.812/0.812/0.000 ms\n";

const TIMEOUT_REPLY: &str = "PING 192.168.1.1 (192.168.1.1) 56(84) bytes of data.\n\
\n\
--- 192.168.1.1 ping statistics ---\n\
1 packets transmitted, 0 received, 100% packet loss, time 0ms\n";

/// Benchmark ping output parsing
fn benchmark_ping_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("ping_parsing");

    group.bench_function("reply", |b| {
        b.iter(|| black_box(parse_round_trip_ms(black_box(LINUX_REPLY))));
    });

    group.bench_function("timeout", |b| {
        b.iter(|| black_box(parse_round_trip_ms(black_box(TIMEOUT_REPLY))));
    });

    group.finish();
}

/// Benchmark log line rendering
fn benchmark_log_template(c: &mut Criterion) {
    let template = LogTemplate::default();
    let now = chrono::Local::now();

    c.bench_function("log_template_render", |b| {
        b.iter(|| {
            black_box(template.render(
                log::Level::Info,
                "netpulse::monitor",
                &"Download speed: 87.53 Mbps, Upload speed: 12.10 Mbps",
                now,
            ))
        });
    });
}

criterion_group!(benches, benchmark_ping_parsing, benchmark_log_template);
criterion_main!(benches);
