#![no_main]

use arbitrary::Arbitrary;
use futures::executor::block_on;
use libfuzzer_sys::fuzz_target;
use sealstream::{
    cipher::{SharedKey, KEY_LENGTH},
    transport::{mocks, Sink as _},
    Config, Reader as _, SecureReader,
};

const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64KB buffer

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    key: [u8; KEY_LENGTH],
    chunks: Vec<Vec<u8>>,
    capacity: u16,
}

fn fuzz(input: FuzzInput) {
    block_on(async {
        let (mut sink, stream) = mocks::Channel::init();
        for chunk in &input.chunks {
            sink.send(chunk).await.unwrap();
        }
        sink.close().await.unwrap();

        let config = Config {
            max_message_size: MAX_MESSAGE_SIZE,
        };
        let mut reader = SecureReader::new(stream, SharedKey::from(input.key), &config);
        let mut buf = vec![0u8; input.capacity as usize];
        while let Ok(n) = reader.read(&mut buf).await {
            assert!(n <= buf.len());
            if n == 0 {
                break;
            }
        }
    });
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
