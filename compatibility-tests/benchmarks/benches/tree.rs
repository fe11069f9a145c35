use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sxd_soap::{writer::Writer, Package, Protocol, QName};

fn populate(package: &Package, items: usize) {
    let doc = package.as_document();
    let body = doc.body().expect("new messages have a body");
    let order = body
        .add_child_element(QName::with_prefix("urn:shop", "Order", "shop"))
        .expect("valid name");

    for i in 0..items {
        order
            .add_child_element(("Item", "shop"))
            .and_then(|item| item.add_attribute("sku", &i.to_string()))
            .and_then(|item| item.add_text_node("coffee"))
            .expect("valid item");
    }
}

fn build_body(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_body");

    for items in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(items), &items, |b, &items| {
            b.iter(|| {
                let package = Package::with_protocol(Protocol::Soap12);
                populate(&package, items);
                package
            });
        });
    }

    group.finish();
}

fn resolve_deep_namespace(c: &mut Criterion) {
    let package = Package::new();
    let doc = package.as_document();
    let mut element = doc.body().expect("new messages have a body");
    element
        .add_namespace_declaration("deep", "urn:deep")
        .expect("valid declaration");
    for _ in 0..100 {
        element = element.add_child_element("level").expect("valid name");
    }

    c.bench_function("resolve_deep_namespace", |b| {
        b.iter(|| element.namespace_uri("deep"));
    });
}

fn format_body(c: &mut Criterion) {
    let package = Package::new();
    populate(&package, 1000);
    let doc = package.as_document();
    let writer = Writer::new();

    c.bench_function("format_body", |b| {
        b.iter(|| {
            let mut output = Vec::new();
            writer.format_document(&doc, &mut output).expect("formatted");
            output
        });
    });
}

criterion_group!(benches, build_body, resolve_deep_namespace, format_body);
criterion_main!(benches);
