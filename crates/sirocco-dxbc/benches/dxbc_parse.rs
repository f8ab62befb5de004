use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sirocco_dxbc::test_utils::build_container;
use sirocco_dxbc::{DxbcFile, FourCC};

fn bench_parse(c: &mut Criterion) {
    // A container shaped like a typical compiled shader: two signatures and
    // a few KiB of program tokens.
    let isgn = vec![0u8; 8];
    let osgn = vec![0u8; 8];
    let shex = vec![0u8; 8 * 1024];
    let bytes = build_container(&[
        (FourCC(*b"ISGN"), &isgn),
        (FourCC(*b"OSGN"), &osgn),
        (FourCC(*b"SHEX"), &shex),
    ]);

    c.bench_function("dxbc_parse_container", |b| {
        b.iter(|| DxbcFile::parse(black_box(&bytes)).unwrap())
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
