use criterion::criterion_main;


criterion_main!(frame::benches, handshake::benches);
