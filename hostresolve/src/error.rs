//! Error taxonomy and status mapper (spec section 4.1).

use thiserror::Error;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};

/// Which namespace a [`StreamError`] code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDomain {
    /// An integer matching the host platform's `errno` namespace.
    Posix,
    /// A resolver-level error in the `NetDb` namespace.
    NetDb,
}

/// `NetDb`-domain codes. Values carry no semantics beyond distinguishability
/// and matching `getaddrinfo`-style names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetDbCode {
    HostNotFound,
    NoData,
    Memory,
    Cancelled,
    NoName,
    BadFlags,
    AddrFamilyUnsupported,
    Internal,
    Fail,
}

impl NetDbCode {
    fn as_i32(self) -> i32 {
        match self {
            NetDbCode::HostNotFound => 1,
            NetDbCode::NoData => 2,
            NetDbCode::Memory => 3,
            NetDbCode::Cancelled => 4,
            NetDbCode::NoName => 5,
            NetDbCode::BadFlags => 6,
            NetDbCode::AddrFamilyUnsupported => 7,
            NetDbCode::Internal => 8,
            NetDbCode::Fail => 9,
        }
    }
}

/// The two-field `{domain, code}` error delivered to clients (spec section 6/7).
#[derive(Debug, Clone, Copy, Error)]
pub enum StreamError {
    #[error("posix error {0}")]
    Posix(i32),
    #[error("netdb error {0:?}")]
    NetDb(NetDbCode),
}

impl StreamError {
    pub fn domain(&self) -> ErrorDomain {
        match self {
            StreamError::Posix(_) => ErrorDomain::Posix,
            StreamError::NetDb(_) => ErrorDomain::NetDb,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            StreamError::Posix(errno) => *errno,
            StreamError::NetDb(code) => code.as_i32(),
        }
    }

    pub fn host_not_found() -> Self {
        StreamError::NetDb(NetDbCode::HostNotFound)
    }

    pub fn cancelled() -> Self {
        StreamError::NetDb(NetDbCode::Cancelled)
    }

    pub fn addr_family_unsupported() -> Self {
        StreamError::NetDb(NetDbCode::AddrFamilyUnsupported)
    }

    /// A literal-address host queried under a family filter its own address
    /// doesn't match (e.g. `IPv4OnlyAddresses` on a v6 literal).
    pub fn no_data() -> Self {
        StreamError::NetDb(NetDbCode::NoData)
    }

    pub fn posix_not_supported() -> Self {
        #[cfg(unix)]
        {
            StreamError::Posix(libc::ENOTSUP)
        }
        #[cfg(not(unix))]
        {
            StreamError::Posix(129)
        }
    }

    pub fn posix_no_mem() -> Self {
        #[cfg(unix)]
        {
            StreamError::Posix(libc::ENOMEM)
        }
        #[cfg(not(unix))]
        {
            StreamError::Posix(12)
        }
    }

    /// Map a `trust-dns-resolver` failure onto the `{domain, code}` taxonomy
    /// (spec section 4.1). Every resolver status maps to exactly one code;
    /// there is no unmapped path.
    pub fn from_resolve_error(err: &ResolveError) -> Self {
        match err.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => StreamError::NetDb(NetDbCode::NoData),
            ResolveErrorKind::Message(_) | ResolveErrorKind::Msg(_) => {
                StreamError::NetDb(NetDbCode::Fail)
            }
            ResolveErrorKind::Io(io_err) => io_err
                .raw_os_error()
                .map(StreamError::Posix)
                .unwrap_or(StreamError::NetDb(NetDbCode::Internal)),
            ResolveErrorKind::Proto(_) => StreamError::NetDb(NetDbCode::BadFlags),
            ResolveErrorKind::Timeout => StreamError::NetDb(NetDbCode::Fail),
            _ => StreamError::NetDb(NetDbCode::Internal),
        }
    }
}

/// Errors raised by misuse of the public API that are not part of the
/// resolver-driver status taxonomy (ambient addition, not sent to clients).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("a lookup is already in flight for this host")]
    AlreadyResolving,
}
