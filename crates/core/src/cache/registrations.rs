//! Record of the active cache generation per registered script.
//!
//! The host consults this on startup: an unchanged generation name means the
//! previously activated version is resumed instead of reinstalled.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl CacheDb {
    /// Remember that `version` became active for `script_url`.
    pub async fn record_activation(&self, script_url: &str, version: &str) -> Result<(), Error> {
        let script_url = script_url.to_string();
        let version = version.to_string();
        let activated_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO registrations (script_url, active_version, activated_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(script_url) DO UPDATE SET
                        active_version = excluded.active_version,
                        activated_at = excluded.activated_at",
                    params![script_url, version, activated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The version last recorded as active for `script_url`.
    pub async fn active_version(&self, script_url: &str) -> Result<Option<String>, Error> {
        let script_url = script_url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT active_version FROM registrations WHERE script_url = ?1",
                    params![script_url],
                    |row| row.get(0),
                );

                match result {
                    Ok(version) => Ok(Some(version)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}
