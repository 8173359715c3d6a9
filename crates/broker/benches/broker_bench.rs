use broker::{Broker, Consumer, InMemoryBroker, Producer, ProducerRecord};
use criterion::{Criterion, criterion_group, criterion_main};

fn make_record(i: u64) -> ProducerRecord {
    ProducerRecord::new(
        format!("order-{}", i % 16),
        payload_for(i).into_bytes(),
    )
    .header("event-type", "PaymentRequested")
    .header("source", "order-service")
}

fn payload_for(i: u64) -> String {
    format!(r#"{{"orderId":"order-{i}","customerId":"c1","amount":50}}"#)
}

fn bench_publish_single(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let broker = InMemoryBroker::new();
    let producer = rt.block_on(broker.connect_producer("bench")).unwrap();
    let mut i = 0u64;

    c.bench_function("broker/publish_single", |b| {
        b.iter(|| {
            i += 1;
            rt.block_on(producer.send("payment-requests", make_record(i)))
                .unwrap();
        });
    });
}

fn bench_publish_then_consume_100(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("broker/publish_then_consume_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                let broker = InMemoryBroker::new();
                let producer = broker.connect_producer("bench").await.unwrap();
                let mut consumer = broker.connect_consumer("bench", "bench-group").await.unwrap();
                consumer.subscribe("payment-requests", false).await.unwrap();

                for i in 0..100 {
                    producer
                        .send("payment-requests", make_record(i))
                        .await
                        .unwrap();
                }
                for _ in 0..100 {
                    consumer.next_message().await.unwrap().unwrap();
                }
            });
        });
    });
}

criterion_group!(benches, bench_publish_single, bench_publish_then_consume_100);
criterion_main!(benches);
