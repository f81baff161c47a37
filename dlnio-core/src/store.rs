//! Wear-leveled flash store
//!
//! Persists one data page per logical address in a small region of NOR
//! flash. The region is split into erase sectors, each holding a
//! [`SectorHeader`] followed by a page of data:
//!
//! ```text
//! 0        4          12         20     22        30     32          4096
//! ┌────────┬──────────┬──────────┬──────┬─────────┬──────┬─────────────┐
//! │ magic  │ wear     │ version  │ addr │ pad (0) │ csum │ data page   │
//! │ u32    │ u64      │ u64      │ u16  │ [u8; 8] │ u16  │ 4064 bytes  │
//! └────────┴──────────┴──────────┴──────┴─────────┴──────┴─────────────┘
//! ```
//!
//! Every update writes a whole new sector with a higher version, so the
//! sector with the highest version for an address is the current one
//! and older copies are reclaimed by later writes. Writes are staged in
//! RAM and committed when the page is filled, when the address is read,
//! when another address is written, or on an explicit [`FlashStore::commit`].

use dlnio_hal::NorFlash;
use dlnio_protocol::header::{read_u16, write_u16};
use dlnio_protocol::ResultCode;

/// Erase unit and record size
pub const SECTOR_SIZE: usize = 4096;

/// Sectors in the store region
pub const SECTOR_COUNT: usize = 4;

/// Bytes of flash used by the store
pub const REGION_SIZE: usize = SECTOR_SIZE * SECTOR_COUNT;

/// Encoded [`SectorHeader`] size
pub const SECTOR_HEADER_SIZE: usize = 32;

/// Data bytes per sector
pub const PAGE_SIZE: usize = SECTOR_SIZE - SECTOR_HEADER_SIZE;

/// Marks an initialised sector
pub const MAGIC: u32 = 0x224e_8d1e;

const CHECKSUM_OFFSET: usize = 30;
const PAD: core::ops::Range<usize> = 22..30;

/// Store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Erase, program or read failed
    Flash,
    /// Access outside the data page
    OutOfRange,
    /// Every sector holds the current version of some address
    NoSpace,
}

impl From<StoreError> for ResultCode {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OutOfRange => ResultCode::BadParameter,
            StoreError::Flash | StoreError::NoSpace => ResultCode::Fail,
        }
    }
}

/// Sector header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SectorHeader {
    /// Times this sector has been programmed
    pub wear: u64,
    /// Version of the address' content held by this sector
    pub version: u64,
    /// Logical address the content belongs to
    pub address: u16,
}

impl SectorHeader {
    /// Serialize with magic, zero pad and checksum
    pub fn encode(&self) -> [u8; SECTOR_HEADER_SIZE] {
        let mut buf = [0u8; SECTOR_HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        buf[4..12].copy_from_slice(&self.wear.to_le_bytes());
        buf[12..20].copy_from_slice(&self.version.to_le_bytes());
        write_u16(&mut buf, 20, self.address);
        let sum = checksum(&buf);
        write_u16(&mut buf, CHECKSUM_OFFSET, sum);
        buf
    }

    /// Parse a header, returning `None` unless the sector is valid
    pub fn decode(buf: &[u8; SECTOR_HEADER_SIZE]) -> Option<Self> {
        let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let wear = u64::from_le_bytes(buf[4..12].try_into().ok()?);
        let version = u64::from_le_bytes(buf[12..20].try_into().ok()?);

        if magic != MAGIC || wear == 0 || version == 0 {
            return None;
        }
        if buf[PAD].iter().any(|&b| b != 0) {
            return None;
        }
        if read_u16(buf, CHECKSUM_OFFSET) != checksum(buf) {
            return None;
        }

        Some(Self {
            wear,
            version,
            address: read_u16(buf, 20),
        })
    }
}

/// Wrapping byte sum of everything before the checksum field
fn checksum(buf: &[u8; SECTOR_HEADER_SIZE]) -> u16 {
    buf[..CHECKSUM_OFFSET]
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(b as u16))
}

/// Copy `src[offset..]` into `dst`, zero-filling past the end of `src`
fn copy_or_zero(dst: &mut [u8], src: &[u8], offset: usize) {
    let available = src.len().saturating_sub(offset).min(dst.len());
    if available > 0 {
        dst[..available].copy_from_slice(&src[offset..offset + available]);
    }
    dst[available..].fill(0);
}

#[derive(Debug, Clone, Copy)]
struct Staged {
    sector: usize,
    address: u16,
}

/// Flash-backed page store
pub struct FlashStore<F> {
    flash: F,
    /// Offset of the first sector in `flash`
    base: u32,
    staged: Option<Staged>,
    /// Image of the staged sector, header included
    buf: [u8; SECTOR_SIZE],
}

impl<F: NorFlash> FlashStore<F> {
    /// Create a store over the sectors starting at `base`
    pub fn new(flash: F, base: u32) -> Self {
        Self {
            flash,
            base,
            staged: None,
            buf: [0; SECTOR_SIZE],
        }
    }

    /// Address of the write waiting in RAM, if any
    pub fn staged_address(&self) -> Option<u16> {
        self.staged.map(|s| s.address)
    }

    fn sector_offset(&self, sector: usize) -> u32 {
        self.base + (sector * SECTOR_SIZE) as u32
    }

    /// Read and validate the header of `sector`
    pub fn header(&mut self, sector: usize) -> Result<Option<SectorHeader>, StoreError> {
        let mut raw = [0u8; SECTOR_HEADER_SIZE];
        let offset = self.sector_offset(sector);
        self.flash
            .read(offset, &mut raw)
            .map_err(|_| StoreError::Flash)?;
        Ok(SectorHeader::decode(&raw))
    }

    /// Find the current sector for `address`
    pub fn find(&mut self, address: u16) -> Result<Option<(usize, SectorHeader)>, StoreError> {
        let mut best: Option<(usize, SectorHeader)> = None;
        for sector in 0..SECTOR_COUNT {
            let Some(header) = self.header(sector)? else {
                continue;
            };
            if header.address != address {
                continue;
            }
            if best.map_or(true, |(_, b)| header.version > b.version) {
                best = Some((sector, header));
            }
        }
        Ok(best)
    }

    /// Pick the sector for a new write and the wear it had
    fn allocate(&mut self) -> Result<(usize, u64), StoreError> {
        let mut headers = [None; SECTOR_COUNT];
        for (sector, slot) in headers.iter_mut().enumerate() {
            *slot = self.header(sector)?;
        }

        // A sector that never held valid content
        if let Some(sector) = headers.iter().position(Option::is_none) {
            return Ok((sector, 0));
        }

        // Otherwise the least worn stale copy of any address
        let mut addresses = heapless::Vec::<u16, SECTOR_COUNT>::new();
        for header in headers.iter().flatten() {
            if !addresses.contains(&header.address) {
                let _ = addresses.push(header.address);
            }
        }

        let mut best: Option<(usize, u64)> = None;
        for &address in &addresses {
            let current = headers
                .iter()
                .flatten()
                .filter(|h| h.address == address)
                .map(|h| h.version)
                .max();
            for (sector, header) in headers.iter().enumerate() {
                let Some(header) = header else { continue };
                if header.address != address || Some(header.version) == current {
                    continue;
                }
                if best.map_or(true, |(_, wear)| header.wear < wear) {
                    best = Some((sector, header.wear));
                }
            }
        }

        best.ok_or(StoreError::NoSpace)
    }

    /// Read `buf.len()` bytes of `address` starting at `offset`
    ///
    /// A staged write to the same address is committed first. Bytes come
    /// from `default` (zero-filled) if the address was never written and
    /// read as zero past the end of the data page.
    pub fn read(
        &mut self,
        address: u16,
        offset: usize,
        buf: &mut [u8],
        default: &[u8],
    ) -> Result<(), StoreError> {
        if self.staged_address() == Some(address) {
            self.commit()?;
        }

        let Some((sector, _)) = self.find(address)? else {
            copy_or_zero(buf, default, offset);
            return Ok(());
        };

        let in_page = PAGE_SIZE.saturating_sub(offset).min(buf.len());
        if in_page > 0 {
            let from = self.sector_offset(sector) + (SECTOR_HEADER_SIZE + offset) as u32;
            self.flash
                .read(from, &mut buf[..in_page])
                .map_err(|_| StoreError::Flash)?;
        }
        buf[in_page..].fill(0);
        Ok(())
    }

    /// Stage `data` at `offset` of `address`
    ///
    /// Starts a new copy of the page on the first write. The write is
    /// committed when it ends exactly at the end of the page.
    pub fn write(
        &mut self,
        address: u16,
        offset: usize,
        data: &[u8],
        default: &[u8],
    ) -> Result<(), StoreError> {
        let end = offset + data.len();
        if end > PAGE_SIZE {
            return Err(StoreError::OutOfRange);
        }

        if let Some(staged) = self.staged {
            if staged.address != address {
                self.commit()?;
            }
        }

        if self.staged.is_none() {
            self.stage(address, default)?;
        }

        self.buf[SECTOR_HEADER_SIZE + offset..SECTOR_HEADER_SIZE + end].copy_from_slice(data);

        if end == PAGE_SIZE {
            self.commit()?;
        }
        Ok(())
    }

    /// Prepare the staging buffer for a new version of `address`
    fn stage(&mut self, address: u16, default: &[u8]) -> Result<(), StoreError> {
        let (sector, wear) = self.allocate()?;

        let version = match self.find(address)? {
            Some((current, header)) => {
                let from = self.sector_offset(current) + SECTOR_HEADER_SIZE as u32;
                self.flash
                    .read(from, &mut self.buf[SECTOR_HEADER_SIZE..])
                    .map_err(|_| StoreError::Flash)?;
                header.version + 1
            }
            None => {
                copy_or_zero(&mut self.buf[SECTOR_HEADER_SIZE..], default, 0);
                1
            }
        };

        let header = SectorHeader {
            wear: wear + 1,
            version,
            address,
        };
        self.buf[..SECTOR_HEADER_SIZE].copy_from_slice(&header.encode());
        self.staged = Some(Staged { sector, address });

        debug!(
            "Staging address {=u16:#x} in sector {} (version {=u64}, wear {=u64})",
            address,
            sector,
            version,
            header.wear
        );
        Ok(())
    }

    /// Write the staged sector to flash
    ///
    /// Does nothing if no write is staged. The staged write is dropped if
    /// flash reports an error.
    pub fn commit(&mut self) -> Result<(), StoreError> {
        let Some(staged) = self.staged.take() else {
            return Ok(());
        };

        let from = self.sector_offset(staged.sector);
        let to = from + SECTOR_SIZE as u32;
        let result = self
            .flash
            .erase(from, to)
            .and_then(|_| self.flash.write(from, &self.buf));

        match result {
            Ok(()) => {
                debug!("Committed sector {}", staged.sector);
                Ok(())
            }
            Err(_) => {
                error!("Flash commit of sector {} failed", staged.sector);
                Err(StoreError::Flash)
            }
        }
    }

    /// Release the flash driver
    pub fn into_inner(self) -> F {
        self.flash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemFlash;
    use proptest::prelude::*;

    const DEFAULT: &[u8] = b"HELLO\0";

    fn store() -> FlashStore<MemFlash> {
        FlashStore::new(MemFlash::new(REGION_SIZE), 0)
    }

    #[test]
    fn test_header_layout() {
        let header = SectorHeader {
            wear: 3,
            version: 7,
            address: 0x50,
        };
        let raw = header.encode();

        assert_eq!(&raw[0..4], &[0x1e, 0x8d, 0x4e, 0x22]);
        assert_eq!(raw[4], 3);
        assert_eq!(raw[12], 7);
        assert_eq!(raw[20], 0x50);
        assert_eq!(&raw[22..30], &[0; 8]);
        assert_eq!(SectorHeader::decode(&raw), Some(header));
    }

    #[test]
    fn test_header_validity() {
        let good = SectorHeader {
            wear: 1,
            version: 1,
            address: 0x10,
        }
        .encode();

        let mut bad_pad = good;
        bad_pad[25] = 1;
        assert_eq!(SectorHeader::decode(&bad_pad), None);

        let mut bad_sum = good;
        bad_sum[31] ^= 0xff;
        assert_eq!(SectorHeader::decode(&bad_sum), None);

        let zero_wear = SectorHeader {
            wear: 0,
            version: 1,
            address: 0x10,
        }
        .encode();
        assert_eq!(SectorHeader::decode(&zero_wear), None);

        // Erased flash
        assert_eq!(SectorHeader::decode(&[0xff; SECTOR_HEADER_SIZE]), None);
    }

    #[test]
    fn test_read_default_image() {
        let mut store = store();
        let mut buf = [0xaa; 8];
        store.read(0x10, 0, &mut buf, DEFAULT).unwrap();
        assert_eq!(&buf, b"HELLO\0\0\0");

        store.read(0x10, 4, &mut buf[..4], DEFAULT).unwrap();
        assert_eq!(&buf[..4], b"O\0\0\0");
    }

    #[test]
    fn test_write_then_read() {
        let mut store = store();
        store.write(0x10, 2, b"abc", DEFAULT).unwrap();
        assert_eq!(store.staged_address(), Some(0x10));

        let mut buf = [0; 8];
        store.read(0x10, 0, &mut buf, DEFAULT).unwrap();
        assert_eq!(&buf, b"HEabc\0\0\0");
        assert_eq!(store.staged_address(), None);

        let (_, header) = store.find(0x10).unwrap().unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.wear, 1);
    }

    #[test]
    fn test_copy_on_write_keeps_content() {
        let mut store = store();
        store.write(0x10, 0, b"first", DEFAULT).unwrap();
        store.commit().unwrap();
        store.write(0x10, 10, b"second", DEFAULT).unwrap();

        let mut buf = [0; 16];
        store.read(0x10, 0, &mut buf, DEFAULT).unwrap();
        assert_eq!(&buf[..5], b"first");
        assert_eq!(&buf[10..16], b"second");
        assert_eq!(store.find(0x10).unwrap().unwrap().1.version, 2);
    }

    #[test]
    fn test_full_page_commits() {
        let mut store = store();
        let page = [0x5a; PAGE_SIZE];
        store.write(0x10, 0, &page, DEFAULT).unwrap();
        assert_eq!(store.staged_address(), None);

        // Previous version stays on flash until reclaimed
        store.write(0x10, 0, &page, DEFAULT).unwrap();
        assert!(store.header(0).unwrap().is_some());
        assert_eq!(store.header(1).unwrap().map(|h| h.version), Some(2));

        let mut buf = [0; 4];
        store.read(0x10, PAGE_SIZE - 2, &mut buf, DEFAULT).unwrap();
        assert_eq!(buf, [0x5a, 0x5a, 0, 0]);
    }

    #[test]
    fn test_write_past_page() {
        let mut store = store();
        assert_eq!(
            store.write(0x10, PAGE_SIZE - 1, &[1, 2], DEFAULT),
            Err(StoreError::OutOfRange)
        );
        assert_eq!(store.staged_address(), None);
    }

    #[test]
    fn test_other_address_commits_pending() {
        let mut store = store();
        store.write(0x10, 0, b"one", DEFAULT).unwrap();
        store.write(0x20, 0, b"two", DEFAULT).unwrap();
        assert_eq!(store.staged_address(), Some(0x20));
        assert!(store.find(0x10).unwrap().is_some());

        let mut buf = [0; 3];
        store.read(0x20, 0, &mut buf, DEFAULT).unwrap();
        assert_eq!(&buf, b"two");
        store.read(0x10, 0, &mut buf, DEFAULT).unwrap();
        assert_eq!(&buf, b"one");
    }

    #[test]
    fn test_no_space() {
        let mut store = store();
        for address in 1..=SECTOR_COUNT as u16 {
            store.write(address, 0, &[address as u8], DEFAULT).unwrap();
            store.commit().unwrap();
        }
        assert_eq!(store.write(0x99, 0, &[0], DEFAULT), Err(StoreError::NoSpace));
    }

    #[test]
    fn test_flash_error_drops_staging() {
        let mut store = store();
        store.write(0x10, 0, b"x", DEFAULT).unwrap();
        store.flash.fail_writes = true;
        assert_eq!(store.commit(), Err(StoreError::Flash));
        assert_eq!(store.staged_address(), None);

        store.flash.fail_writes = false;
        let mut buf = [0; 1];
        store.read(0x10, 0, &mut buf, DEFAULT).unwrap();
        assert_eq!(&buf, b"H");
    }

    #[test]
    fn test_reuses_least_worn_stale_sector() {
        let mut store = store();
        for i in 0..SECTOR_COUNT {
            store.write(0x10, 0, &[i as u8], DEFAULT).unwrap();
            store.commit().unwrap();
        }
        // All sectors hold versions 1..=4; version 1 in sector 0 is reclaimed
        store.write(0x10, 0, &[9], DEFAULT).unwrap();
        store.commit().unwrap();

        let header = store.header(0).unwrap().unwrap();
        assert_eq!(header.version, 5);
        assert_eq!(header.wear, 2);
    }

    proptest! {
        #[test]
        fn prop_wear_stays_level(writes in SECTOR_COUNT..40usize) {
            let mut store = store();
            for i in 0..writes {
                store.write(0x10, i % 16, &[i as u8], DEFAULT).unwrap();
                store.commit().unwrap();
            }

            let mut wears = [0u64; SECTOR_COUNT];
            for (sector, wear) in wears.iter_mut().enumerate() {
                *wear = store.header(sector).unwrap().unwrap().wear;
            }
            let max = wears.iter().max().unwrap();
            let min = wears.iter().min().unwrap();
            prop_assert!(max - min <= 1);

            let (_, current) = store.find(0x10).unwrap().unwrap();
            prop_assert_eq!(current.version, writes as u64);
        }

        #[test]
        fn prop_read_back(offset in 0..PAGE_SIZE - 64, data in proptest::collection::vec(any::<u8>(), 1..64)) {
            let mut store = store();
            store.write(0x10, offset, &data, DEFAULT).unwrap();

            let mut buf = [0u8; 64];
            store.read(0x10, offset, &mut buf[..data.len()], DEFAULT).unwrap();
            prop_assert_eq!(&buf[..data.len()], &data[..]);
        }
    }
}
