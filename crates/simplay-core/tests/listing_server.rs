//! Listing client against a minimal local HTTP server.

use tokio::io::{ AsyncReadExt, AsyncWriteExt };
use tokio::net::TcpListener;

use simplay_core::{ ListingEntry, ListingError, ServerClient };


/// Serves a single canned response and returns the request line it saw.
async fn serve_once( status: &'static str, body: &'static str ) -> ( String, tokio::task::JoinHandle<String> ) {
    let listener = TcpListener::bind( "127.0.0.1:0" ).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn( async move {
        let ( mut socket, _ ) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [ 0u8; 1024 ];
        while !request.windows( 4 ).any( |w| w == b"\r\n\r\n" ) {
            let n = socket.read( &mut buf ).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice( &buf[ ..n ] );
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all( response.as_bytes() ).await.unwrap();
        socket.shutdown().await.ok();

        let text = String::from_utf8_lossy( &request ).to_string();
        text.lines().next().unwrap_or_default().to_string()
    });

    ( format!( "http://{}/", addr ), handle )
}


#[tokio::test]
async fn fetches_and_parses_listing() {
    let ( server, handle ) = serve_once(
        "200 OK",
        r#"[{"type":"directory","name":"Live"},{"type":"file","name":"a b.mp3"}]"#,
    ).await;

    let client = ServerClient::new( &server ).unwrap();
    let entries = client.listing( "/music/Best Of" ).await.unwrap();

    assert_eq!( entries, vec![
        ListingEntry::directory( "Live" ),
        ListingEntry::file( "a b.mp3" ),
    ]);
    assert_eq!( handle.await.unwrap(), "GET /music/Best%20Of HTTP/1.1" );
}


#[tokio::test]
async fn non_success_status_is_an_error() {
    let ( server, _handle ) = serve_once( "404 Not Found", "" ).await;

    let client = ServerClient::new( &server ).unwrap();
    match client.listing( "/missing" ).await {
        Err( ListingError::Status { status, url } ) => {
            assert_eq!( status, 404 );
            assert!( url.ends_with( "/missing" ) );
        }
        other => panic!( "expected status error, got {:?}", other ),
    }
}


#[tokio::test]
async fn unknown_entry_kind_is_an_error() {
    let ( server, _handle ) = serve_once( "200 OK", r#"[{"type":"socket","name":"s"}]"# ).await;

    let client = ServerClient::new( &server ).unwrap();
    let result = client.listing( "/music" ).await;
    assert!( matches!( result, Err( ListingError::UnknownEntryKind { .. } ) ) );
}


#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    // Bind and drop to get a port with nothing listening on it.
    let listener = TcpListener::bind( "127.0.0.1:0" ).await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop( listener );

    let client = ServerClient::new( &format!( "http://{}/", addr ) ).unwrap();
    let result = client.listing( "/music" ).await;
    assert!( matches!( result, Err( ListingError::Network( _ ) ) ) );
}


#[tokio::test]
async fn downloads_track_body() {
    let ( server, handle ) = serve_once( "200 OK", "ID3fake" ).await;

    let client = ServerClient::new( &server ).unwrap();
    let body = client.track( "/music/a%20b.mp3" ).await.unwrap();

    assert_eq!( body, b"ID3fake" );
    assert_eq!( handle.await.unwrap(), "GET /music/a%20b.mp3 HTTP/1.1" );
}
