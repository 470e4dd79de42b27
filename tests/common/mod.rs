use std::time::Duration;

use blogcms::{get_random_free_port, make_router, run_app, Config};
use tempfile::TempDir;

/// A running server backed by its own SQLite file and upload directory.
pub struct TestServer {
    pub base_url: String,
    pub http: reqwest::Client,
    dir: TempDir,
}

impl TestServer {
    pub async fn start() -> TestServer {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config =
            Config::for_database(format!("sqlite://{}", dir.path().join("blog.db").display()));
        config.bind_address = get_random_free_port().expect("free port");
        config.upload_dir = dir.path().join("uploads");

        let base_url = format!("http://{}", config.bind_address);
        tokio::spawn(run_app(make_router(), config));

        let http = reqwest::Client::new();
        for _ in 0..100 {
            if let Ok(response) = http.get(format!("{base_url}/api/health")).send().await {
                if response.status().is_success() {
                    return TestServer {
                        base_url,
                        http,
                        dir,
                    };
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("server did not start at {base_url}");
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    pub fn upload_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("uploads")
    }
}
