use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio::runtime::Runtime;

use cube2_master::codec::cube2;
use cube2_master::net::{PingError, Pinger};
use cube2_master::registry::Registry;

struct AlwaysOk {
    reply: Vec<u8>,
}

#[async_trait]
impl Pinger for AlwaysOk {
    async fn ping(&self, _ip: Ipv4Addr, _port: u16) -> Result<Vec<u8>, PingError> {
        Ok(self.reply.clone())
    }
}

fn sample_info_reply() -> Vec<u8> {
    let mut v = vec![0x81, 0xEC, 0x04, 0x01, 0x00, 0x00, 0x00];
    v.extend_from_slice(b"dropzone\x00");
    v.extend_from_slice(b"Einherjer Europe [linuxiuvat.de]\x00");
    v
}

fn bench_codec(c: &mut Criterion) {
    let ascii = "the quick brown Fox JUMPS over 123!@# ".repeat(8);
    let accented = "\u{00c4}\u{00d6}\u{00dc}\u{00e4}\u{00f6}\u{00fc}".repeat(8);
    let encoded_accented = cube2::encode(&accented);

    c.bench_function("cube2_encode_ascii", |b| {
        b.iter(|| cube2::encode(black_box(&ascii)));
    });

    c.bench_function("cube2_decode_accented", |b| {
        b.iter(|| cube2::decode(black_box(&encoded_accented)));
    });
}

fn bench_registry(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("registry_register_fresh_identity", |b| {
        b.iter_batched(
            || Registry::new(Arc::new(AlwaysOk { reply: sample_info_reply() })),
            |registry| {
                rt.block_on(async {
                    registry
                        .register(None, Ipv4Addr::new(203, 0, 113, 1), "*", 28800, "master".to_string())
                        .await
                        .unwrap();
                });
            },
            criterion::BatchSize::SmallInput,
        );
    });

    c.bench_function("registry_reping_and_prune_100_servers", |b| {
        b.iter_batched(
            || {
                let registry = Registry::new(Arc::new(AlwaysOk { reply: sample_info_reply() }));
                rt.block_on(async {
                    for i in 0..100u32 {
                        let octet = (i % 250) as u8 + 1;
                        registry
                            .register(
                                None,
                                Ipv4Addr::new(203, 0, 113, octet),
                                "*",
                                28800,
                                "master".to_string(),
                            )
                            .await
                            .unwrap();
                    }
                });
                registry
            },
            |registry| {
                rt.block_on(registry.reping_and_prune());
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_codec, bench_registry);
criterion_main!(benches);
