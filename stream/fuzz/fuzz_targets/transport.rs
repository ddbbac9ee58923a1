#![no_main]

use futures::{executor::block_on, join};
use libfuzzer_sys::fuzz_target;
use rand::rngs::OsRng;
use sealstream::{handshake, transport::mocks, Config, Reader as _, Writer as _};

const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64KB buffer

fn fuzz(data: &[u8]) {
    block_on(async {
        let (dialer_sink, listener_stream) = mocks::Channel::init();
        let (listener_sink, dialer_stream) = mocks::Channel::init();

        let (mut listener_rng, mut dialer_rng) = (OsRng, OsRng);
        let (listener, dialer) = join!(
            handshake::listen(&mut listener_rng, listener_sink, listener_stream),
            handshake::dial(&mut dialer_rng, dialer_sink, dialer_stream),
        );

        let config = Config {
            max_message_size: MAX_MESSAGE_SIZE,
        };
        let mut listener = listener.unwrap().into_channel(&config).unwrap();
        let mut dialer = dialer.unwrap().into_channel(&config).unwrap();

        let mut buf = vec![0u8; 1024];
        for chunk in data.chunks(1024) {
            dialer.write(chunk).await.unwrap();
            let n = listener.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], chunk);

            listener.write(chunk).await.unwrap();
            let n = dialer.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], chunk);
        }
    });
}

fuzz_target!(|input: &[u8]| {
    fuzz(input);
});
