//! Request/response entries within a cache generation.
//!
//! Entries are keyed by `compute_request_key(method, url)` and written with
//! UPSERT semantics, so concurrent writers of the same key are last-write-wins.

use super::connection::CacheDb;
use super::hash::{compute_request_key, url_without_fragment};
use crate::{Error, Method, Request, Response};
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

/// A stored snapshot as listed from a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub method: Method,
    pub url: String,
    pub response: Response,
    pub stored_at: String,
}

/// A row ready to be written, detached from the borrowed request/response.
struct EntryRow {
    key_hash: String,
    method: String,
    request_url: String,
    response_url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Bytes,
    stored_at: String,
}

/// Check that a request/response pair may be stored.
///
/// Only GET requests are storable and partial responses are refused.
pub fn validate_storable(request: &Request, response: &Response) -> Result<(), Error> {
    if !request.method.is_get() {
        return Err(Error::InvalidRequest(format!("{} {} is not cacheable", request.method, request.url)));
    }
    if response.status == 206 {
        return Err(Error::UnsupportedResponse(format!("partial response for {}", request.url)));
    }
    Ok(())
}

impl EntryRow {
    fn new(request: &Request, response: &Response, stored_at: &str) -> Result<Self, Error> {
        validate_storable(request, response)?;
        Ok(Self {
            key_hash: compute_request_key(request.method.as_str(), &request.url),
            method: request.method.to_string(),
            request_url: url_without_fragment(&request.url),
            response_url: response.url.to_string(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.clone(),
            stored_at: stored_at.to_string(),
        })
    }

    fn insert(&self, conn: &rusqlite::Connection, generation: &str) -> Result<(), Error> {
        conn.execute(
            "INSERT INTO entries (
                generation, key_hash, method, request_url, response_url,
                status, status_text, headers_json, body, stored_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(generation, key_hash) DO UPDATE SET
                method = excluded.method,
                request_url = excluded.request_url,
                response_url = excluded.response_url,
                status = excluded.status,
                status_text = excluded.status_text,
                headers_json = excluded.headers_json,
                body = excluded.body,
                stored_at = excluded.stored_at",
            params![
                generation,
                &self.key_hash,
                &self.method,
                &self.request_url,
                &self.response_url,
                self.status,
                &self.status_text,
                &self.headers_json,
                self.body.as_ref(),
                &self.stored_at,
            ],
        )?;
        Ok(())
    }
}

/// Raw column values of an `entries` row, decoded outside the SQLite closure.
type RawEntry = (String, String, String, u16, String, String, Vec<u8>, String);

fn decode(raw: RawEntry) -> Result<CacheEntry, Error> {
    let (method, request_url, response_url, status, status_text, headers_json, body, stored_at) = raw;
    let url = Url::parse(&response_url).map_err(|e| Error::CorruptEntry(format!("response url: {e}")))?;
    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
    let method = method.parse().map_err(|_| Error::CorruptEntry(format!("method {method:?}")))?;

    Ok(CacheEntry {
        method,
        url: request_url,
        response: Response { url, status, status_text, headers, body: Bytes::from(body) },
        stored_at,
    })
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?))
}

impl CacheDb {
    /// Insert or replace one entry in a generation.
    ///
    /// Fails if the generation does not exist.
    pub async fn upsert_entry(&self, generation: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let row = EntryRow::new(request, response, &chrono::Utc::now().to_rfc3339())?;
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> { row.insert(conn, &generation) })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace many entries in one transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn upsert_entries(&self, generation: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        let stored_at = chrono::Utc::now().to_rfc3339();
        let rows = entries
            .iter()
            .map(|(req, resp)| EntryRow::new(req, resp, &stored_at))
            .collect::<Result<Vec<_>, _>>()?;
        let generation = generation.to_string();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for row in &rows {
                    row.insert(&tx, &generation)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry matching a request.
    ///
    /// Returns None on a miss, including for any non-GET request.
    pub async fn get_entry(&self, generation: &str, request: &Request) -> Result<Option<CacheEntry>, Error> {
        if !request.method.is_get() {
            return Ok(None);
        }

        let key_hash = compute_request_key(request.method.as_str(), &request.url);
        let generation = generation.to_string();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, request_url, response_url, status, status_text, headers_json, body, stored_at
                     FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                match stmt.query_row(params![generation, key_hash], read_raw) {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(decode).transpose()
    }

    /// List every entry of a generation in insertion order.
    pub async fn list_entries(&self, generation: &str) -> Result<Vec<CacheEntry>, Error> {
        let generation = generation.to_string();
        let raws = self
            .conn
            .call(move |conn| -> Result<Vec<RawEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, request_url, response_url, status, status_text, headers_json, body, stored_at
                     FROM entries WHERE generation = ?1 ORDER BY rowid ASC",
                )?;
                let rows = stmt.query_map(params![generation], read_raw)?.collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        raws.into_iter().map(decode).collect()
    }
}
