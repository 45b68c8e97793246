use criterion::{black_box, criterion_group, criterion_main, Criterion};
use joycon_core::{decode_status, ImuCalibration, ReportBuilder, ZeroOffset};
use joycon_types::Buttons;

fn bench_decode_status(c: &mut Criterion) {
    let report = ReportBuilder::full_state()
        .battery(3, true)
        .buttons(Buttons::A | Buttons::R | Buttons::LEFT)
        .left_stick(2100, 1980)
        .right_stick(2048, 2048)
        .imu_raw([[120, -40, 4096, 3, -2, 1]; 3])
        .build();
    let calibration = ImuCalibration::default();
    let offset = ZeroOffset::capture(&report, &calibration);
    
    c.bench_function("decode_status", |b| {
        b.iter(|| decode_status(black_box(&report), &calibration, &offset))
    });
}

criterion_group!(benches, bench_decode_status);
criterion_main!(benches);
