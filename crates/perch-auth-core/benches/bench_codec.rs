//! Benchmarks for credential verification hot paths

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use perch_auth_core::{constant_time_eq, AuthConfig, AuthService, CredentialCodec, HmacKey};
use perch_store::MemorySessionStore;
use perch_types::{SubjectId, TokenKind};

const ACCESS_SECRET: &str = "bench-access-secret-0123456789abcdef";
const REFRESH_SECRET: &str = "bench-refresh-secret-0123456789abcde";

fn bench_hmac(c: &mut Criterion) {
    let key = HmacKey::new(ACCESS_SECRET).unwrap();
    let mut group = c.benchmark_group("hmac_sign");

    for size in [64, 256, 1024] {
        let data: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| key.sign(black_box(data)));
        });
    }

    group.finish();

    let a = [7u8; 43];
    let b = [7u8; 43];
    c.bench_function("constant_time_eq_43", |bench| {
        bench.iter(|| constant_time_eq(black_box(&a), black_box(&b)));
    });
}

fn bench_codec(c: &mut Criterion) {
    let codec = CredentialCodec::new(ACCESS_SECRET, REFRESH_SECRET).unwrap();
    let subject = SubjectId::from(42u64);

    c.bench_function("codec_issue_access", |b| {
        b.iter(|| codec.issue(black_box(&subject), TokenKind::Access, Duration::from_secs(900)));
    });

    let mut group = c.benchmark_group("codec_verify");

    let access = codec
        .issue(&subject, TokenKind::Access, Duration::from_secs(900))
        .unwrap();
    group.bench_function("access", |b| {
        b.iter(|| codec.verify(black_box(&access.token)));
    });

    // Refresh credentials are checked against the access key first
    let refresh = codec
        .issue(&subject, TokenKind::Refresh, Duration::from_secs(900))
        .unwrap();
    group.bench_function("refresh", |b| {
        b.iter(|| codec.verify(black_box(&refresh.token)));
    });

    let mut forged = access.token.clone();
    let last = forged.pop();
    forged.push(if last == Some('A') { 'B' } else { 'A' });
    group.bench_function("forged", |b| {
        b.iter(|| codec.verify(black_box(&forged)));
    });

    group.finish();
}

fn bench_login(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let config = AuthConfig::try_new(ACCESS_SECRET, REFRESH_SECRET).unwrap();
    let auth = AuthService::new(config, Arc::new(MemorySessionStore::new())).unwrap();
    let subject = SubjectId::from(42u64);

    c.bench_function("service_login_memory_store", |b| {
        b.to_async(&runtime).iter(|| auth.login(black_box(&subject)));
    });
}

criterion_group!(benches, bench_hmac, bench_codec, bench_login);
criterion_main!(benches);
