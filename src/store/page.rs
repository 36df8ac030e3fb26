use chrono::Utc;

use crate::constants::ERR_EMPTY_PAGE_NAME;
use crate::db::{keys, kv, tables, Db};
use crate::error::{AppError, Result};
use crate::models::{PageDraft, PageRecord};
use crate::normalize::normalize_lower_unreserved;

/// CRUD over named content pages.
///
/// The normalized page name is both the primary key and the page's slot;
/// a rename moves the record to a new slot inside one transaction.
pub struct PageStore {
    db: Db,
}

impl PageStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a page; fails with `PageAlreadyExists` if the slot is taken.
    pub fn create_page(&self, draft: &PageDraft) -> Result<PageRecord> {
        let name = normalize_lower_unreserved(&draft.name);
        if name.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_PAGE_NAME.to_string()));
        }

        let txn = self.db.begin_write()?;
        let page = {
            let mut table = txn.open_table(tables::HOST)?;

            if kv::get_raw(&table, &keys::page(&name))?.is_some() {
                return Err(AppError::PageAlreadyExists(name));
            }

            let page = PageRecord {
                name: name.clone(),
                title: draft.title.clone(),
                content: draft.content.clone(),
                content_type: draft.content_type,
                created_at: Utc::now().timestamp(),
            };
            kv::put(&mut table, &keys::page(&name), &page)?;
            page
        };
        txn.commit()?;
        Ok(page)
    }

    /// Load a page by name.
    pub fn get_page(&self, name: &str) -> Result<PageRecord> {
        let name = normalize_lower_unreserved(name);
        if name.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_PAGE_NAME.to_string()));
        }

        let txn = self.db.begin_read()?;
        let table = txn.open_table(tables::HOST)?;
        let page: PageRecord =
            kv::get(&table, &keys::page(&name))?.ok_or(AppError::PageNotFound)?;
        if page.name != name {
            tracing::error!("Page record at '{}' embeds name '{}'", name, page.name);
            return Err(AppError::Integrity(format!(
                "page record for '{}' embeds name '{}'",
                name, page.name
            )));
        }
        Ok(page)
    }

    /// Rewrite a page, optionally renaming it from `prev_name`.
    ///
    /// A rename validates the target slot is free, then deletes the old slot
    /// and inserts the new one in the same transaction.
    pub fn update_page(&self, draft: &PageDraft, prev_name: Option<&str>) -> Result<PageRecord> {
        let name = normalize_lower_unreserved(&draft.name);
        if name.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_PAGE_NAME.to_string()));
        }
        let prev = prev_name.map(normalize_lower_unreserved).unwrap_or_default();

        let txn = self.db.begin_write()?;
        let page = {
            let mut table = txn.open_table(tables::HOST)?;

            if !prev.is_empty() && prev != name {
                if kv::get_raw(&table, &keys::page(&name))?.is_some() {
                    return Err(AppError::PageAlreadyExists(name));
                }
                kv::delete(&mut table, &keys::page(&prev))?;
            }

            let page = PageRecord {
                name: name.clone(),
                title: draft.title.clone(),
                content: draft.content.clone(),
                content_type: draft.content_type,
                created_at: Utc::now().timestamp(),
            };
            kv::put(&mut table, &keys::page(&name), &page)?;
            page
        };
        txn.commit()?;
        Ok(page)
    }

    /// Remove a page; fails with `PageNotFound` if the slot is empty.
    pub fn remove_page(&self, name: &str) -> Result<()> {
        let name = normalize_lower_unreserved(name);
        if name.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_PAGE_NAME.to_string()));
        }

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(tables::HOST)?;
            if kv::get_raw(&table, &keys::page(&name))?.is_none() {
                return Err(AppError::PageNotFound);
            }
            kv::delete(&mut table, &keys::page(&name))?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Visit every page in name order; the visitor returns `false` to stop.
    pub fn enum_pages<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(PageRecord) -> bool,
    {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(tables::HOST)?;
        kv::scan_prefix(&table, keys::PAGE_PREFIX, |_, payload| {
            let page: PageRecord = kv::decode(payload)?;
            Ok(visit(page))
        })
    }
}
