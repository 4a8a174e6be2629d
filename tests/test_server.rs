use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use talon::scan;
use talon::server::{ConnId, Gateway, RequestHandler, Server, WriteOutcome, WriteStatus};

fn spawn_server<H>(handler: H) -> SocketAddr
where
    H: RequestHandler + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut server = Server::bind("127.0.0.1:0", handler).expect("bind failed");
        tx.send(server.local_addr().expect("no local addr")).unwrap();
        let _ = server.run();
    });
    rx.recv().unwrap()
}

/// A handler buffering bytes per connection until the header block is
/// complete, the way a real application callback is expected to.
fn buffering_handler<F>(
    max_header_bytes: usize,
    mut respond: F,
) -> impl FnMut(&mut Gateway<'_>, ConnId, &[u8]) + Send
where
    F: FnMut(&mut Gateway<'_>, ConnId, &[u8], usize) + Send,
{
    let mut partial: HashMap<ConnId, Vec<u8>> = HashMap::new();
    move |gateway: &mut Gateway<'_>, conn: ConnId, data: &[u8]| {
        let buf = partial.entry(conn).or_default();
        buf.extend_from_slice(data);

        match scan::find_body_start(buf) {
            Some(body_start) => {
                let request = partial.remove(&conn).unwrap_or_default();
                respond(gateway, conn, &request, body_start);
            }
            None if buf.len() >= max_header_bytes => {
                partial.remove(&conn);
                gateway.send_and_close(
                    conn,
                    b"HTTP/1.1 413 Content Too Large\r\nContent-Length: 0\r\n\r\n",
                );
            }
            None => {}
        }
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn test_responds_and_closes() {
    let addr = spawn_server(buffering_handler(8192, |gateway, conn, _req, _body| {
        let status = gateway.send_and_close(
            conn,
            b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        );
        assert_ne!(status, WriteStatus::Failed);
    }));

    let mut client = TcpStream::connect(addr).unwrap();
    client
        .write_all(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n")
        .unwrap();

    let mut response = Vec::new();
    client.read_to_end(&mut response).unwrap();
    assert!(response.starts_with(b"HTTP/1.1 200 OK"));
    assert!(response.ends_with(b"ok"));
}

#[test]
fn test_multiple_sequential_clients() {
    let addr = spawn_server(buffering_handler(8192, |gateway, conn, _req, _body| {
        gateway.send_and_close(conn, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
    }));

    for _ in 0..5 {
        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n")
            .unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).unwrap();
        assert!(response.starts_with(b"HTTP/1.1 200 OK"));
    }
}

#[test]
fn test_oversized_headers_get_413_then_close() {
    let max = 8192;
    let addr = spawn_server(buffering_handler(max, |gateway, conn, _req, _body| {
        gateway.send_and_close(conn, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
    }));

    let mut client = TcpStream::connect(addr).unwrap();
    // A header block that never terminates, exactly at the policy limit.
    client.write_all(&vec![b'x'; max]).unwrap();

    let mut response = Vec::new();
    client.read_to_end(&mut response).unwrap();
    assert!(response.starts_with(b"HTTP/1.1 413"));
}

#[test]
fn test_chained_writes_stay_in_order() {
    let addr = spawn_server(buffering_handler(8192, |gateway, conn, _req, _body| {
        let status = gateway.send(
            conn,
            b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n",
            Box::new(|gateway, conn, outcome| {
                if outcome == WriteOutcome::Done {
                    gateway.send_and_close(conn, b"0123456789");
                }
            }),
        );
        assert_ne!(status, WriteStatus::Failed);
    }));

    let mut client = TcpStream::connect(addr).unwrap();
    client
        .write_all(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n")
        .unwrap();

    let mut response = Vec::new();
    client.read_to_end(&mut response).unwrap();
    assert!(response.starts_with(b"HTTP/1.1 200 OK"));
    assert!(response.ends_with(b"0123456789"));
}

#[test]
fn test_large_response_survives_backpressure() {
    // 200000 bytes, submitted as two writes within the buffer capacity, with
    // the client slow to read so the first write backpressures mid-way.
    let body = pattern(200_000);
    let total = body.len();
    let addr = spawn_server(buffering_handler(8192, move |gateway, conn, _req, _body| {
        let first = body[..131_072].to_vec();
        let rest = body[131_072..].to_vec();
        let status = gateway.send(
            conn,
            &first,
            Box::new(move |gateway, conn, outcome| {
                if outcome == WriteOutcome::Done {
                    gateway.send_and_close(conn, &rest);
                }
            }),
        );
        assert_ne!(status, WriteStatus::Failed);
    }));

    let mut client = TcpStream::connect(addr).unwrap();
    client
        .write_all(b"GET /big HTTP/1.1\r\nHost: a\r\n\r\n")
        .unwrap();
    // Let the server hit the socket's limit before we start draining.
    thread::sleep(Duration::from_millis(200));

    let mut received = Vec::new();
    client.read_to_end(&mut received).unwrap();
    assert_eq!(received.len(), total);
    assert_eq!(received, pattern(total));
}

#[test]
fn test_client_closing_first_is_quietly_torn_down() {
    let addr = spawn_server(buffering_handler(8192, |gateway, conn, _req, _body| {
        gateway.send_and_close(conn, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
    }));

    // Connect and leave without sending anything.
    let client = TcpStream::connect(addr).unwrap();
    drop(client);

    // The server must still be healthy for the next client.
    let mut client = TcpStream::connect(addr).unwrap();
    client
        .write_all(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n")
        .unwrap();
    let mut response = Vec::new();
    client.read_to_end(&mut response).unwrap();
    assert!(response.starts_with(b"HTTP/1.1 200 OK"));
}
