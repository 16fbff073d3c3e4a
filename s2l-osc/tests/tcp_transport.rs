use std::net::TcpListener;
use std::time::{Duration, Instant};

use s2l_osc::OscTransport;

/// Mirrors the teacher's bind-a-loopback-listener-then-drive-the-client
/// pattern used for its own TCP reconnection tests.
#[test]
fn tcp_transport_connects_and_delivers_a_framed_message() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    listener.set_nonblocking(true).unwrap();

    let mut transport = OscTransport::new(0, "127.0.0.1:0".parse().unwrap(), addr).unwrap();
    transport.set_use_tcp(true);

    // Drive the 20ms initial reconnect schedule with real time advances.
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        transport.tick(Instant::now());
        if listener.accept().is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}
