// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Startup recovery of an interrupted page rewrite.
//!
//! Runs inside `NvmEngine::open`, and again before the next call whenever a
//! rewrite fails during the session. A valid shadow record means the named
//! page may be half erased or half written, so it is rebuilt from the shadow
//! payload (the last committed attribute bytes). Bytes of that page outside
//! every attribute range come back erased.
//!
//! After the rollback the restored page gets a fresh parity record. Records
//! of other pages are left alone so a latent flip on them stays correctable;
//! only records lost with an interrupted host page rewrite are recomputed.
//!
//! A shadow page that holds anything other than a valid record is a backup
//! that never completed. The page it was protecting was not touched yet, so
//! the shadow is simply erased.

use crate::ecc::{is_erased_record, MAX_RECORD_LEN};
use crate::engine::NvmEngine;
use crate::error::Result;
use crate::flash::{self, FlashDevice, ERASED};
use crate::shadow::ShadowRecord;
use crate::types::PageIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Shadow page was erased: the last shutdown was clean.
    Clean,
    /// A partially written shadow record was found and erased.
    DiscardedTornShadow,
    /// The named page was rolled back to its shadow copy.
    RestoredPage(PageIndex),
}

impl<F: FlashDevice> NvmEngine<F> {
    pub(crate) fn recover(&mut self) -> Result<RecoveryOutcome> {
        let Some(shadow) = self.layout.shadow else {
            return Ok(RecoveryOutcome::Clean);
        };

        self.device.read(shadow.address(), &mut self.aux_buf)?;
        if flash::is_erased(&self.aux_buf) {
            tracing::debug!("Shadow page empty, nothing to recover");
            return Ok(RecoveryOutcome::Clean);
        }

        let restored = match ShadowRecord::decode(&self.aux_buf) {
            Ok(record) if self.is_restorable(&record) => {
                self.page_buf.fill(ERASED);
                let mut cursor = 0;
                for desc in self.layout.map.on_page(record.page) {
                    let offset = self.layout.geometry.page_offset(desc.start);
                    self.page_buf[offset..offset + desc.len()]
                        .copy_from_slice(&record.payload[cursor..cursor + desc.len()]);
                    cursor += desc.len();
                }
                Some(record.page)
            }
            Ok(record) => {
                tracing::warn!(
                    "Shadow record for page {} ({} bytes) does not match the block map",
                    record.page,
                    record.payload.len()
                );
                None
            }
            Err(e) => {
                tracing::warn!("Discarding torn shadow record: {}", e);
                None
            }
        };

        let Some(page) = restored else {
            self.device.erase(shadow.address())?;
            return Ok(RecoveryOutcome::DiscardedTornShadow);
        };

        let page_start = self.layout.geometry.page_start(page);
        self.device.erase(page_start)?;
        self.device.write(page_start, &self.page_buf)?;
        self.reseal(page)?;
        self.device.erase(shadow.address())?;

        tracing::info!("Rolled page {} back to its shadow copy", page);
        Ok(RecoveryOutcome::RestoredPage(page))
    }

    /// Recomputes the parity record of `page`, plus any record that reads
    /// erased. The host page is rewritten only if a record changed.
    pub(crate) fn reseal(&mut self, page: PageIndex) -> Result<()> {
        let Some(ecc) = self.layout.ecc else {
            return Ok(());
        };
        let geometry = self.layout.geometry;
        let host_start = geometry.page_start(ecc.host_page());
        let record_len = ecc.record_len();

        self.device.read(host_start, &mut self.aux_buf)?;
        let mut changed = 0;
        for i in 0..self.layout.map.data_pages().len() {
            let data_page = self.layout.map.data_pages()[i];
            let offset = geometry.page_offset(ecc.record_address(data_page));
            let record = offset..offset + record_len;
            if data_page != page && !is_erased_record(&self.aux_buf[record.clone()]) {
                continue;
            }

            self.device.read(geometry.page_start(data_page), &mut self.page_buf)?;
            let mut encoded = [0u8; MAX_RECORD_LEN];
            ecc.codec()
                .calculate_parity(&self.page_buf)
                .encode(&mut encoded[..record_len]);
            if self.aux_buf[record.clone()] != encoded[..record_len] {
                self.aux_buf[record].copy_from_slice(&encoded[..record_len]);
                changed += 1;
            }
        }

        if changed > 0 {
            self.device.erase(host_start)?;
            self.device.write(host_start, &self.aux_buf)?;
        }
        tracing::debug!("Resealed page {} ({} parity records updated)", page, changed);
        Ok(())
    }

    fn is_restorable(&self, record: &ShadowRecord<'_>) -> bool {
        self.layout.map.data_pages().contains(&record.page)
            && record.payload.len() == self.layout.map.payload_len(record.page)
    }
}
