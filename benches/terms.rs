use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use elsa_query::{quote_value, FieldDescriptor, FieldSchema, Query};

fn schema(extra_fields: usize) -> Arc<FieldSchema> {
    let mut fields = vec![
        FieldDescriptor::new("ANY.host").display("host"),
        FieldDescriptor::new("FIREWALL.srcip").input_validation("IPv4"),
        FieldDescriptor::new("FIREWALL.srcport").field_type("int"),
    ];
    fields.extend((0..extra_fields).map(|i| FieldDescriptor::new(format!("CLASS{}.field{}", i, i))));
    Arc::new(FieldSchema::new(fields))
}

fn add_terms(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_term");
    for size in [0usize, 100, 1000] {
        let schema = schema(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &schema, |b, schema| {
            b.iter(|| {
                let mut query = Query::new(schema.clone());
                query.add_term(black_box("host=10.0.0.1")).unwrap();
                query.set_boolean("AND").unwrap();
                query.add_term(black_box("FIREWALL.srcip=192.168.1.20")).unwrap();
                query.add_term(black_box("FIREWALL.srcport>=1024")).unwrap();
                query.submit()
            })
        });
    }
    group.finish();
}

fn serialize(c: &mut Criterion) {
    let mut query = Query::new(schema(0));
    for port in 1000..1100 {
        query.add_term(&format!("FIREWALL.srcport={}", port)).unwrap();
    }
    query.add_meta("groupby", vec!["srcip"]);
    c.bench_function("to_json 100 terms", |b| b.iter(|| black_box(&query).to_json()));
}

fn quoting(c: &mut Criterion) {
    c.bench_function("quote_value safe", |b| {
        b.iter(|| quote_value(black_box("mail.example.com")))
    });
    c.bench_function("quote_value unsafe", |b| {
        b.iter(|| quote_value(black_box("Accepted publickey for root")))
    });
}

criterion_group!(benches, add_terms, serialize, quoting);
criterion_main!(benches);
