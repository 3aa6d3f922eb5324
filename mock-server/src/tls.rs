//! HTTPS serving with a freshly minted self-signed certificate.

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use axum::{serve::Listener, Router};
use rcgen::{CertificateParams, DnType, KeyPair};
use sha2::{Digest, Sha256};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc,
};
use tokio_rustls::{
    rustls::{
        self,
        pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer},
        ServerConfig,
    },
    server::TlsStream,
    TlsAcceptor,
};
use tracing::{debug, warn};

/// A self-signed certificate and its private key, both DER-encoded.
#[derive(Clone)]
pub struct TlsIdentity {
    cert_der: Vec<u8>,
    key_der: Vec<u8>,
}

impl TlsIdentity {
    /// Generate a certificate with a common name and no Subject Alternative
    /// Names, so standard hostname verification can never succeed against it.
    pub fn self_signed() -> Result<Self, rcgen::Error> {
        let mut params = CertificateParams::new(Vec::<String>::new())?;
        params
            .distinguished_name
            .push(DnType::CommonName, "Outline Mock Server");
        let key = KeyPair::generate()?;
        let cert = params.self_signed(&key)?;
        Ok(Self {
            cert_der: cert.der().to_vec(),
            key_der: key.serialize_der(),
        })
    }

    pub fn cert_der(&self) -> &[u8] {
        &self.cert_der
    }

    /// Upper-case hex SHA-256 of the certificate, as written to `access.txt`.
    pub fn cert_sha256(&self) -> String {
        hex::encode_upper(Sha256::digest(&self.cert_der))
    }

    pub fn acceptor(&self) -> Result<TlsAcceptor, rustls::Error> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(
                vec![CertificateDer::from(self.cert_der.clone())],
                PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key_der.clone())),
            )?;
        Ok(TlsAcceptor::from(Arc::new(config)))
    }
}

impl std::fmt::Debug for TlsIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsIdentity")
            .field("cert_sha256", &self.cert_sha256())
            .finish_non_exhaustive()
    }
}

/// A peer that has not finished its handshake by then is dropped.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Handshaken connections waiting for axum to pick them up.
const READY_BACKLOG: usize = 64;

type Accepted = (TlsStream<TcpStream>, SocketAddr);

/// Hands axum connections whose TLS handshake has already completed.
///
/// A background task accepts TCP connections and runs each handshake in its
/// own task, so a peer that never sends a ClientHello only holds up itself.
/// Failed or timed-out handshakes are logged and skipped.
pub struct TlsListener {
    ready: mpsc::Receiver<Accepted>,
    local_addr: SocketAddr,
}

impl TlsListener {
    /// Must be called from within a tokio runtime.
    pub fn new(inner: TcpListener, acceptor: TlsAcceptor) -> io::Result<Self> {
        let local_addr = inner.local_addr()?;
        let (tx, ready) = mpsc::channel(READY_BACKLOG);
        tokio::spawn(accept_loop(inner, acceptor, tx));
        Ok(Self { ready, local_addr })
    }
}

async fn accept_loop(inner: TcpListener, acceptor: TlsAcceptor, tx: mpsc::Sender<Accepted>) {
    loop {
        let (stream, addr) = tokio::select! {
            _ = tx.closed() => return,
            conn = inner.accept() => match conn {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("accept failed: {e}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            },
        };
        let acceptor = acceptor.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
                Ok(Ok(tls)) => {
                    debug!("tls connection from {addr}");
                    let _ = tx.send((tls, addr)).await;
                }
                Ok(Err(e)) => warn!("tls handshake with {addr} failed: {e}"),
                Err(_) => warn!("tls handshake with {addr} timed out"),
            }
        });
    }
}

impl Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        match self.ready.recv().await {
            Some(conn) => conn,
            // The accept loop only stops once this receiver is dropped.
            None => std::future::pending().await,
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        Ok(self.local_addr)
    }
}

/// Serve `app` over HTTPS on `listener` using `identity`.
pub async fn serve_tls(listener: TcpListener, identity: &TlsIdentity, app: Router) -> io::Result<()> {
    let acceptor = identity.acceptor().map_err(io::Error::other)?;
    axum::serve(TlsListener::new(listener, acceptor)?, app).await
}
