//! Client for the storage service's REST API.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Result, StorageError};
use crate::files::{AssetSet, FilesMap, LEOPARD_FOLDER, SCRATCH_FOLDER};

const SAVE_PATH: &str = "api/save";
const LOAD_PATH: &str = "api/load";

/// Talks to a storage server such as `http://localhost:3000`.
#[derive(Debug, Clone)]
pub struct StorageClient {
    client: Client,
    base: Url,
}

impl StorageClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    /// Create with default timeout of 30 seconds.
    pub fn with_default_timeout(base: &str) -> Result<Self> {
        Self::new(base, Duration::from_secs(30))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `POST /api/save`. The server replaces whatever it held before.
    ///
    /// Each `leopard` file part is matched by position with a `leopard` text
    /// field naming its directory.
    #[instrument(skip_all, fields(files = assets.leopard().len()))]
    pub async fn save(&self, assets: &AssetSet) -> Result<()> {
        let scratch = Part::bytes(assets.scratch.data.to_vec())
            .file_name(assets.scratch.name.clone());
        let mut form = Form::new().part(SCRATCH_FOLDER, scratch);
        for file in assets.leopard() {
            let part = Part::bytes(file.data.to_vec()).file_name(file.name.clone());
            form = form
                .part(LEOPARD_FOLDER, part)
                .text(LEOPARD_FOLDER, file.dir.clone());
        }

        let response = self
            .client
            .post(self.base.join(SAVE_PATH)?)
            .multipart(form)
            .send()
            .await?;
        check(response.status())?;
        debug!("project uploaded");
        Ok(())
    }

    /// `GET /api/load`.
    #[instrument(skip_all)]
    pub async fn load(&self) -> Result<FilesMap> {
        let response = self.client.get(self.base.join(LOAD_PATH)?).send().await?;
        check(response.status())?;
        let map: FilesMap = response.json().await?;
        debug!(files = map.files_map.len(), "project downloaded");
        Ok(map)
    }

    pub async fn load_assets(&self) -> Result<AssetSet> {
        self.load().await?.to_assets()
    }
}

fn check(status: reqwest::StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(StorageError::Status { status })
    }
}
