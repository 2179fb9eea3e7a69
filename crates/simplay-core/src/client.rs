//! HTTP access to the listing server.
//!
//! Directory paths and track sources are resolved against the server URL.
//! Requests are issued once; failures are returned to the caller, never
//! retried.

use reqwest::header::ACCEPT;
use reqwest::Url;

use crate::listing::{ parse_listing, ListingEntry, ListingError };


/// Client for directory listings and track bodies.
#[derive( Debug, Clone )]
pub struct ServerClient {
    http: reqwest::Client,
    server: Url,
}


impl ServerClient {
    /// Creates a client for the server at `server` (e.g. `http://host:8080/`).
    pub fn new( server: &str ) -> Result<Self, ListingError> {
        let server = Url::parse( server )
            .map_err( |e| ListingError::InvalidUrl( format!( "{}: {}", server, e ) ) )?;

        let http = reqwest::Client::builder()
            .user_agent( concat!( "simplay/", env!( "CARGO_PKG_VERSION" ) ) )
            .build()?;

        Ok( Self { http, server } )
    }


    /// Returns the server URL.
    pub fn server( &self ) -> &Url {
        &self.server
    }


    /// Resolves a directory path or track source against the server URL.
    pub fn resolve( &self, path: &str ) -> Result<Url, ListingError> {
        self.server
            .join( path )
            .map_err( |e| ListingError::InvalidUrl( format!( "{}: {}", path, e ) ) )
    }


    /// Fetches the listing of a directory.
    pub async fn listing( &self, path: &str ) -> Result<Vec<ListingEntry>, ListingError> {
        let body = self.get( path, "application/json" ).await?;
        parse_listing( &body )
    }


    /// Downloads a whole track.
    pub async fn track( &self, source: &str ) -> Result<Vec<u8>, ListingError> {
        self.get( source, "audio/*" ).await
    }


    async fn get( &self, path: &str, accept: &str ) -> Result<Vec<u8>, ListingError> {
        let url = self.resolve( path )?;
        tracing::debug!( "GET {}", url );

        let response = self.http
            .get( url.clone() )
            .header( ACCEPT, accept )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err( ListingError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        tracing::debug!( "Received {} bytes from {}", body.len(), url );
        Ok( body.to_vec() )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_resolve_absolute_path() {
        let client = ServerClient::new( "http://localhost:8080/app/" ).unwrap();
        assert_eq!( client.resolve( "/music/Live" ).unwrap().as_str(), "http://localhost:8080/music/Live" );
    }


    #[test]
    fn test_resolve_relative_path() {
        let client = ServerClient::new( "http://localhost:8080/app/" ).unwrap();
        assert_eq!( client.resolve( "music/a%20b.mp3" ).unwrap().as_str(), "http://localhost:8080/app/music/a%20b.mp3" );
    }


    #[test]
    fn test_resolve_encodes_spaces_in_directories() {
        let client = ServerClient::new( "http://localhost/" ).unwrap();
        assert_eq!( client.resolve( "/music/Best Of" ).unwrap().as_str(), "http://localhost/music/Best%20Of" );
    }


    #[test]
    fn test_invalid_server_url() {
        assert!( matches!( ServerClient::new( "not a url" ), Err( ListingError::InvalidUrl( _ ) ) ) );
    }
}
