//! X authority credentials
//!
//! An [`Authority`] names a numbered display on an address and carries the
//! cookie a client must present to it. Authorities are immutable once
//! created and are shared between sessions and server handles via `Arc`.

use std::fmt;
use std::fs::Permissions;
use std::io::{self, Write};
use std::net::IpAddr;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use log::debug;
use rand::RngCore;

use crate::constants::{
    FAMILY_INTERNET, FAMILY_INTERNET6, FAMILY_LOCAL, FAMILY_WILD, MIT_MAGIC_COOKIE_LEN,
    MIT_MAGIC_COOKIE_NAME, XAUTHORITY_FILE_MODE,
};
use crate::error::{Result, SeatError};

/// Xauthority address family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityFamily {
    /// IPv4 address
    Internet,
    /// IPv6 address
    Internet6,
    /// Local host, address is the hostname
    Local,
    /// Any address
    Wild,
}

impl AuthorityFamily {
    /// Infer the family from an address string
    pub fn for_address(address: &str) -> Self {
        match address.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => Self::Internet,
            Ok(IpAddr::V6(_)) => Self::Internet6,
            Err(_) => Self::Local,
        }
    }

    /// Numeric value written to Xauthority files
    pub fn code(self) -> u16 {
        match self {
            Self::Internet => FAMILY_INTERNET,
            Self::Internet6 => FAMILY_INTERNET6,
            Self::Local => FAMILY_LOCAL,
            Self::Wild => FAMILY_WILD,
        }
    }
}

/// Credential for connecting to one numbered display on one address
#[derive(Clone, PartialEq, Eq)]
pub struct Authority {
    family: AuthorityFamily,
    address: String,
    display_number: u16,
    name: String,
    data: Vec<u8>,
}

impl Authority {
    pub fn new(
        family: AuthorityFamily,
        address: impl Into<String>,
        display_number: u16,
        name: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            family,
            address: address.into(),
            display_number,
            name: name.into(),
            data,
        }
    }

    /// MIT-MAGIC-COOKIE-1 authority with the family inferred from `address`
    pub fn mit_cookie(address: impl Into<String>, display_number: u16, data: Vec<u8>) -> Self {
        let address = address.into();
        let family = AuthorityFamily::for_address(&address);
        Self::new(family, address, display_number, MIT_MAGIC_COOKIE_NAME, data)
    }

    /// Generate a fresh random MIT-MAGIC-COOKIE-1 authority
    pub fn generate(address: impl Into<String>, display_number: u16) -> Self {
        let mut data = vec![0u8; MIT_MAGIC_COOKIE_LEN];
        rand::thread_rng().fill_bytes(&mut data);
        Self::mit_cookie(address, display_number, data)
    }

    /// Build an authority from a hex-encoded cookie
    pub fn from_hex(address: impl Into<String>, display_number: u16, cookie: &str) -> Result<Self> {
        let data = hex::decode(cookie.trim()).map_err(|e| {
            SeatError::invalid_argument(format!("Malformed authority cookie: {}", e))
        })?;
        Ok(Self::mit_cookie(address, display_number, data))
    }

    pub fn family(&self) -> AuthorityFamily {
        self.family
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn display_number(&self) -> u16 {
        self.display_number
    }

    /// Authorization protocol name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Credential bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Address bytes as stored in an Xauthority record
    ///
    /// Internet families store packed octets, everything else the raw string.
    fn address_bytes(&self) -> Vec<u8> {
        match (self.family, self.address.parse::<IpAddr>()) {
            (AuthorityFamily::Internet, Ok(IpAddr::V4(ip))) => ip.octets().to_vec(),
            (AuthorityFamily::Internet6, Ok(IpAddr::V6(ip))) => ip.octets().to_vec(),
            _ => self.address.as_bytes().to_vec(),
        }
    }

    /// Write this authority as one Xauthority record
    ///
    /// Layout: u16 family, then address, display number (decimal),
    /// name and data, each prefixed by a big-endian u16 length.
    pub fn write_record<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.family.code().to_be_bytes())?;
        write_counted(writer, &self.address_bytes())?;
        write_counted(writer, self.display_number.to_string().as_bytes())?;
        write_counted(writer, self.name.as_bytes())?;
        write_counted(writer, &self.data)?;
        Ok(())
    }

    /// Write a single-record Xauthority file readable only by the owner
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(XAUTHORITY_FILE_MODE)
            .open(path)?;
        // mode() only applies on create; an existing file keeps its old bits
        file.set_permissions(Permissions::from_mode(XAUTHORITY_FILE_MODE))?;
        self.write_record(&mut file)?;
        file.flush()?;
        debug!(
            "Wrote authority for {}:{} to {}",
            self.address,
            self.display_number,
            path.display()
        );
        Ok(())
    }
}

// Never print cookie bytes in logs
impl fmt::Debug for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authority")
            .field("family", &self.family)
            .field("address", &self.address)
            .field("display_number", &self.display_number)
            .field("name", &self.name)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .finish()
    }
}

fn write_counted<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    let len = u16::try_from(bytes.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Xauthority field too long: {} bytes", bytes.len()),
        )
    })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_inference() {
        assert_eq!(AuthorityFamily::for_address("10.0.0.5"), AuthorityFamily::Internet);
        assert_eq!(AuthorityFamily::for_address("fe80::1"), AuthorityFamily::Internet6);
        assert_eq!(AuthorityFamily::for_address("terminal-3"), AuthorityFamily::Local);
    }

    #[test]
    fn test_generate_cookie_length() {
        let a = Authority::generate("host", 2);
        let b = Authority::generate("host", 2);
        assert_eq!(a.data().len(), MIT_MAGIC_COOKIE_LEN);
        assert_eq!(a.name(), MIT_MAGIC_COOKIE_NAME);
        assert_ne!(a.data(), b.data());
    }

    #[test]
    fn test_from_hex() {
        let auth = Authority::from_hex("10.0.0.5", 7, "00ff10").unwrap();
        assert_eq!(auth.data(), &[0x00, 0xff, 0x10]);
        assert!(matches!(
            Authority::from_hex("10.0.0.5", 7, "zz"),
            Err(SeatError::InvalidConstructionArgument(_))
        ));
    }

    #[test]
    fn test_debug_hides_cookie() {
        let auth = Authority::mit_cookie("10.0.0.5", 7, vec![0xde, 0xad, 0xbe, 0xef]);
        let printed = format!("{:?}", auth);
        assert!(printed.contains("<4 bytes>"));
        assert!(!printed.contains("222"));
    }

    #[test]
    fn test_record_layout_ipv4() {
        let auth = Authority::mit_cookie("10.0.0.5", 7, vec![0xaa, 0xbb]);
        let mut buf = Vec::new();
        auth.write_record(&mut buf).unwrap();

        let mut expected = vec![0x00, 0x00];
        expected.extend_from_slice(&[0x00, 0x04, 10, 0, 0, 5]);
        expected.extend_from_slice(&[0x00, 0x01, b'7']);
        expected.extend_from_slice(&[0x00, 18]);
        expected.extend_from_slice(MIT_MAGIC_COOKIE_NAME.as_bytes());
        expected.extend_from_slice(&[0x00, 0x02, 0xaa, 0xbb]);
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_record_layout_local() {
        let auth = Authority::mit_cookie("box", 12, vec![1]);
        let mut buf = Vec::new();
        auth.write_record(&mut buf).unwrap();
        assert_eq!(&buf[..2], &[0x01, 0x00]);
        assert_eq!(&buf[2..7], &[0x00, 0x03, b'b', b'o', b'x']);
        assert_eq!(&buf[7..11], &[0x00, 0x02, b'1', b'2']);
    }

    #[test]
    fn test_write_to_file_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth");
        let auth = Authority::generate("10.0.0.5", 1);
        auth.write_to_file(&path).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        let mut expected = Vec::new();
        auth.write_record(&mut expected).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), expected);
    }

    #[test]
    fn test_write_to_file_tightens_existing_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth");
        std::fs::write(&path, b"stale cookie from last run").unwrap();
        std::fs::set_permissions(&path, Permissions::from_mode(0o644)).unwrap();

        let auth = Authority::generate("10.0.0.5", 1);
        auth.write_to_file(&path).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        let mut expected = Vec::new();
        auth.write_record(&mut expected).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), expected);
    }
}
