// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Attribute engine.
//!
//! Owns the validated layout, the flash device and the page-sized scratch
//! buffers. Every call goes through `&mut self`, so a read-modify-write cycle
//! always has exclusive use of the scratch buffers.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::config::{Layout, NvmConfig};
use crate::ecc::{is_erased_record, Correction, EccLayout, ParityBits, MAX_RECORD_LEN};
use crate::error::{ConfigError, EccError, NvmError, Result};
use crate::flash::{FlashDevice, ERASED};
use crate::recovery::RecoveryOutcome;
use crate::shadow::{ShadowRecord, HEADER_LEN};
use crate::storage::BlockMap;
use crate::types::{AttrId, FlashGeometry, PageIndex};

/// Steps of an attribute write. A failure in any step ends the write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WritePhase {
    Validating,
    EccRepair,
    PageBackup,
    Erasing,
    Splicing,
    Writing,
    ParityUpdate,
    Commit,
}

impl fmt::Display for WritePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WritePhase::Validating => "validating",
            WritePhase::EccRepair => "ECC repair",
            WritePhase::PageBackup => "page backup",
            WritePhase::Erasing => "erasing",
            WritePhase::Splicing => "splicing",
            WritePhase::Writing => "writing",
            WritePhase::ParityUpdate => "parity update",
            WritePhase::Commit => "commit",
        };
        f.write_str(name)
    }
}

fn step<T, E: Into<NvmError>>(phase: WritePhase, result: core::result::Result<T, E>) -> Result<T> {
    result.map_err(|e| {
        let e: NvmError = e.into();
        tracing::warn!("Page rewrite aborted during {}: {}", phase, e);
        e
    })
}

pub struct NvmEngine<F: FlashDevice> {
    pub(crate) device: F,
    pub(crate) layout: Layout,
    /// Image of the page being read or rewritten.
    pub(crate) page_buf: Vec<u8>,
    /// Shadow record staging and ECC host page image.
    pub(crate) aux_buf: Vec<u8>,
    recovery: RecoveryOutcome,
    /// Page whose rewrite failed part way in this session.
    interrupted: Option<PageIndex>,
}

impl<F: FlashDevice> NvmEngine<F> {
    /// Validates `config` against `device` and rolls back any rewrite a
    /// previous run left unfinished.
    pub fn open(config: &NvmConfig, device: F) -> Result<Self> {
        let layout = config.validate()?;
        let found = device.geometry();
        if found != layout.geometry {
            return Err(ConfigError::GeometryMismatch {
                expected: layout.geometry,
                found,
            }
            .into());
        }

        if layout.shadow.is_none() {
            tracing::warn!(
                "No shadow page configured: power loss between page erase and rewrite loses every attribute on that page"
            );
        }
        if layout.ecc.is_none() {
            tracing::debug!("ECC disabled");
        }

        let page_size = layout.geometry.page_size() as usize;
        let mut engine = Self {
            device,
            layout,
            page_buf: vec![ERASED; page_size],
            aux_buf: vec![ERASED; page_size],
            recovery: RecoveryOutcome::Clean,
            interrupted: None,
        };
        engine.recovery = engine.recover()?;

        tracing::info!(
            "NVM engine ready: {} attributes on {}",
            engine.layout.map.len(),
            engine.layout.geometry
        );
        Ok(engine)
    }

    // --- Read APIs ---

    /// Reads attribute `id` into `out` and returns its configured length.
    ///
    /// `out` must hold at least the descriptor length.
    pub fn get_attribute(&mut self, id: AttrId, out: &mut [u8]) -> Result<u8> {
        let desc = *self.layout.map.lookup(id)?;
        if out.is_empty() {
            return Err(NvmError::ParamErr("output buffer is empty"));
        }
        if out.len() < desc.len() {
            return Err(NvmError::ParamErr("output buffer is shorter than the attribute"));
        }

        self.settle_interrupted()?;
        let page = self.layout.map.page_of(id)?;
        self.scan_and_fix(page)?;

        self.device.read(desc.start, &mut out[..desc.len()])?;
        tracing::trace!("Read attribute {} ({} bytes)", id, desc.length);
        Ok(desc.length)
    }

    pub fn read_attribute(&mut self, id: AttrId) -> Result<Vec<u8>> {
        let len = self.layout.map.lookup(id)?.len();
        let mut out = vec![0u8; len];
        self.get_attribute(id, &mut out)?;
        Ok(out)
    }

    // --- Write Logic ---

    /// Replaces the first `data.len()` bytes of attribute `id`.
    ///
    /// Costs a full erase and rewrite of the owning page, whatever the
    /// payload size. Bytes of the attribute beyond `data.len()` keep their
    /// previous value.
    pub fn set_attribute(&mut self, id: AttrId, data: &[u8]) -> Result<()> {
        let desc = *self.layout.map.lookup(id)?;
        if data.is_empty() {
            return Err(NvmError::ParamErr("attribute value is empty"));
        }
        if data.len() > desc.len() {
            return Err(NvmError::ParamErr("value is longer than the attribute"));
        }

        self.settle_interrupted()?;
        let page = self.layout.map.page_of(id)?;
        let page_start = self.layout.geometry.page_start(page);
        let offset = self.layout.geometry.page_offset(desc.start);

        step(WritePhase::EccRepair, self.scan_and_fix(page))?;
        step(WritePhase::PageBackup, self.device.read(page_start, &mut self.page_buf))?;
        self.rewrite_page(page, Some((offset, data)))?;

        tracing::debug!(
            "Wrote attribute {} ({} of {} bytes) on page {}",
            id,
            data.len(),
            desc.length,
            page
        );
        Ok(())
    }

    /// Runs scan-and-fix over every page holding attributes. Returns how many
    /// pages needed a correction.
    pub fn scrub(&mut self) -> Result<usize> {
        self.settle_interrupted()?;
        let mut corrected = 0;
        for i in 0..self.layout.map.data_pages().len() {
            let page = self.layout.map.data_pages()[i];
            if let Correction::Corrected { .. } = self.scan_and_fix(page)? {
                corrected += 1;
            }
        }
        Ok(corrected)
    }

    /// Recomputes every parity record from the current page contents.
    ///
    /// Whatever is on flash becomes the protected value, bit rot included.
    pub fn rebuild_parity(&mut self) -> Result<()> {
        self.settle_interrupted()?;
        let Some(ecc) = self.layout.ecc else {
            return Ok(());
        };
        let geometry = self.layout.geometry;
        let host_start = geometry.page_start(ecc.host_page());
        let record_len = ecc.record_len();

        self.device.read(host_start, &mut self.aux_buf)?;
        let region_offset = geometry.page_offset(ecc.region().start);
        self.aux_buf[region_offset..region_offset + ecc.region().len as usize].fill(ERASED);

        for &page in self.layout.map.data_pages() {
            self.device.read(geometry.page_start(page), &mut self.page_buf)?;
            let parity = ecc.codec().calculate_parity(&self.page_buf);
            let offset = geometry.page_offset(ecc.record_address(page));
            parity.encode(&mut self.aux_buf[offset..offset + record_len]);
        }

        self.device.erase(host_start)?;
        self.device.write(host_start, &self.aux_buf)?;
        tracing::info!("Rebuilt parity for {} pages", self.layout.map.data_pages().len());
        Ok(())
    }

    /// Rolls back a rewrite that failed earlier in this session, before the
    /// half-written page or its stale parity record is read again.
    ///
    /// With a shadow page this is the same rollback `open` performs. Without
    /// one the page stays as the failure left it and only its parity record
    /// is recomputed.
    fn settle_interrupted(&mut self) -> Result<()> {
        let Some(page) = self.interrupted else {
            return Ok(());
        };

        if self.layout.shadow.is_some() {
            let outcome = self.recover()?;
            tracing::warn!("Settled interrupted rewrite of page {}: {:?}", page, outcome);
        } else {
            self.reseal(page)?;
            tracing::warn!(
                "Rewrite of page {} failed without a shadow page, keeping its contents as found",
                page
            );
        }
        self.interrupted = None;
        Ok(())
    }

    // --- ECC ---

    /// Verifies `page` against its parity record and persists a correction
    /// before anything else reads from the page.
    fn scan_and_fix(&mut self, page: PageIndex) -> Result<Correction> {
        let Some(ecc) = self.layout.ecc else {
            return Ok(Correction::Clean);
        };

        let record_len = ecc.record_len();
        let mut record = [0u8; MAX_RECORD_LEN];
        self.device.read(ecc.record_address(page), &mut record[..record_len])?;
        if is_erased_record(&record[..record_len]) {
            tracing::debug!("Page {} has no parity record yet, skipping ECC check", page);
            return Ok(Correction::Clean);
        }
        let stored = ParityBits::decode(&record[..record_len]);

        let page_start = self.layout.geometry.page_start(page);
        self.device.read(page_start, &mut self.page_buf)?;

        match ecc.codec().decode_and_correct(&mut self.page_buf, stored) {
            Ok(Correction::Clean) => Ok(Correction::Clean),
            Ok(Correction::Corrected { position }) => {
                tracing::warn!(
                    "Corrected single-bit error on page {} at bit position {}",
                    page,
                    position
                );
                self.rewrite_page(page, None)?;
                Ok(Correction::Corrected { position })
            }
            Err(EccError::Uncorrectable { syndrome }) => {
                tracing::error!("Uncorrectable ECC error on page {} (syndrome {})", page, syndrome);
                Err(NvmError::UncorrectableEcc { page, syndrome })
            }
        }
    }

    // --- Read-modify-write ---

    /// Backs up, erases, splices, rewrites and re-protects `page`.
    ///
    /// `page_buf` must hold the page's current image. `splice` is the page
    /// offset and bytes to overlay before the rewrite. On failure the page is
    /// marked interrupted and settled by the next call.
    fn rewrite_page(&mut self, page: PageIndex, splice: Option<(usize, &[u8])>) -> Result<()> {
        let result = self.run_rewrite(page, splice);
        if result.is_err() {
            self.interrupted = Some(page);
        }
        result
    }

    fn run_rewrite(&mut self, page: PageIndex, splice: Option<(usize, &[u8])>) -> Result<()> {
        let page_start = self.layout.geometry.page_start(page);
        tracing::trace!("Rewriting page {} at {}", page, page_start);

        // 1. Shadow the committed attribute bytes
        step(WritePhase::PageBackup, self.write_shadow(page))?;

        // 2. Erase
        step(WritePhase::Erasing, self.device.erase(page_start))?;

        // 3. Splice
        if let Some((offset, data)) = splice {
            tracing::trace!("{} {} bytes at page offset {}", WritePhase::Splicing, data.len(), offset);
            self.page_buf[offset..offset + data.len()].copy_from_slice(data);
        }

        // 4. Write back the whole page
        step(WritePhase::Writing, self.device.write(page_start, &self.page_buf))?;

        // 5. Parity
        if let Some(ecc) = self.layout.ecc {
            let parity = ecc.codec().calculate_parity(&self.page_buf);
            step(WritePhase::ParityUpdate, self.store_parity(&ecc, page, parity))?;
        }

        // 6. Drop the shadow
        step(WritePhase::Commit, self.clear_shadow())
    }

    fn write_shadow(&mut self, page: PageIndex) -> Result<()> {
        let Some(shadow) = self.layout.shadow else {
            return Ok(());
        };

        let (header, body) = self.aux_buf.split_at_mut(HEADER_LEN);
        let mut len = 0;
        for desc in self.layout.map.on_page(page) {
            let offset = self.layout.geometry.page_offset(desc.start);
            body[len..len + desc.len()].copy_from_slice(&self.page_buf[offset..offset + desc.len()]);
            len += desc.len();
        }
        ShadowRecord::write_header(header, page, &body[..len]);

        self.device.erase(shadow.address())?;
        self.device.write(shadow.address(), &self.aux_buf[..HEADER_LEN + len])?;
        Ok(())
    }

    fn clear_shadow(&mut self) -> Result<()> {
        if let Some(shadow) = self.layout.shadow {
            self.device.erase(shadow.address())?;
        }
        Ok(())
    }

    /// Read-modify-write of the ECC host page with `page`'s new record.
    fn store_parity(&mut self, ecc: &EccLayout, page: PageIndex, parity: ParityBits) -> Result<()> {
        let geometry = self.layout.geometry;
        let host_start = geometry.page_start(ecc.host_page());
        let offset = geometry.page_offset(ecc.record_address(page));
        let record = offset..offset + ecc.record_len();

        self.device.read(host_start, &mut self.aux_buf)?;

        let mut encoded = [0u8; MAX_RECORD_LEN];
        parity.encode(&mut encoded[..ecc.record_len()]);
        if self.aux_buf[record.clone()] == encoded[..ecc.record_len()] {
            tracing::trace!("Parity record of page {} unchanged", page);
            return Ok(());
        }

        self.aux_buf[record].copy_from_slice(&encoded[..ecc.record_len()]);
        self.device.erase(host_start)?;
        self.device.write(host_start, &self.aux_buf)?;
        Ok(())
    }

    // --- Accessors ---

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn block_map(&self) -> &BlockMap {
        &self.layout.map
    }

    pub fn geometry(&self) -> FlashGeometry {
        self.layout.geometry
    }

    /// What `open` found on flash.
    pub fn recovery_outcome(&self) -> RecoveryOutcome {
        self.recovery
    }

    pub fn device(&self) -> &F {
        &self.device
    }

    /// Raw device access. Anything written through it bypasses parity
    /// maintenance and will be reported (or "corrected") by the next access.
    pub fn device_mut(&mut self) -> &mut F {
        &mut self.device
    }

    pub fn into_device(self) -> F {
        self.device
    }
}
