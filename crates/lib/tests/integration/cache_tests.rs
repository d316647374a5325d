//! Dependency cache integration tests against a local HTTP server.

use std::fs;

use substrate_lib::cache::{
  BundleDescriptor, ChecksumMap, DependencyCache, Ensured, StaleReason, checksum::key_to_path, setup_dependencies,
};
use substrate_lib::platform::Os;
use substrate_lib::util::hash::hash_file;

use super::common::{TestEnv, java_static_sdk_zip};

const SDK_PATH: &str = "/staticjdk/labs-staticjdk-linux-gvm-1.0.zip";

fn sdk_url_template(server: &mockito::Server) -> String {
  format!("{}/staticjdk/labs-staticjdk-${{target}}-gvm-${{version}}.zip", server.url())
}

#[tokio::test]
async fn setup_downloads_java_static_sdk_once() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("GET", SDK_PATH)
    .with_body(java_static_sdk_zip())
    .expect(1)
    .create_async()
    .await;
  let env = TestEnv::new();
  let mut config = env.config("Hello");
  config.java_static_sdk_version = "1.0".to_string();
  config.java_static_sdk_url = sdk_url_template(&server);

  setup_dependencies(&config).await.unwrap();
  setup_dependencies(&config).await.unwrap();

  mock.assert_async().await;
  let libs = config.java_static_libs_dir();
  assert_eq!(fs::read(libs.join("libjava.a")).unwrap(), b"java");
  assert!(libs.join("libzip.a").is_file());
}

#[tokio::test]
async fn static_root_override_skips_download() {
  let mut server = mockito::Server::new_async().await;
  let mock = server.mock("GET", mockito::Matcher::Any).expect(0).create_async().await;
  let env = TestEnv::new();
  let mut config = env.config("Hello");
  config.java_static_sdk_url = sdk_url_template(&server);
  config.static_root = Some(env.path().join("my-static-libs"));

  setup_dependencies(&config).await.unwrap();

  mock.assert_async().await;
  assert!(!env.cache_root().exists());
}

#[tokio::test]
async fn stored_digests_match_extracted_files() {
  let mut server = mockito::Server::new_async().await;
  let _mock = server
    .mock("GET", SDK_PATH)
    .with_body(java_static_sdk_zip())
    .create_async()
    .await;
  let env = TestEnv::new();
  let mut config = env.config("Hello");
  config.java_static_sdk_version = "1.0".to_string();
  config.java_static_sdk_url = sdk_url_template(&server);
  let bundle = BundleDescriptor::java_static_sdk(&config);
  let cache = DependencyCache::new(env.cache_root());

  let result = cache.ensure(&bundle, Os::Linux, true).await.unwrap();

  assert_eq!(result, Ensured::Downloaded);
  let map = ChecksumMap::load(&bundle.checksum_map_path(&env.cache_root(), Os::Linux)).unwrap();
  let version_dir = bundle.version_dir(&env.cache_root());
  assert_eq!(map.len(), 4);
  for (key, stored) in map.iter() {
    assert_eq!(&hash_file(&key_to_path(&version_dir, key)).unwrap(), stored);
  }
}

#[tokio::test]
async fn deleted_map_forces_refresh_only_when_verifying() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("GET", SDK_PATH)
    .with_body(java_static_sdk_zip())
    .expect(2)
    .create_async()
    .await;
  let env = TestEnv::new();
  let mut config = env.config("Hello");
  config.java_static_sdk_version = "1.0".to_string();
  config.java_static_sdk_url = sdk_url_template(&server);
  let bundle = BundleDescriptor::java_static_sdk(&config);
  let cache = DependencyCache::new(env.cache_root());
  cache.ensure(&bundle, Os::Linux, true).await.unwrap();

  fs::remove_file(bundle.checksum_map_path(&env.cache_root(), Os::Linux)).unwrap();

  assert_eq!(cache.stale_reason(&bundle, Os::Linux, false), None);
  assert_eq!(
    cache.stale_reason(&bundle, Os::Linux, true),
    Some(StaleReason::MissingChecksumMap)
  );
  assert_eq!(cache.ensure(&bundle, Os::Linux, true).await.unwrap(), Ensured::Downloaded);
  mock.assert_async().await;
}

#[tokio::test]
async fn versions_are_cached_side_by_side() {
  let mut server = mockito::Server::new_async().await;
  let _v1 = server
    .mock("GET", SDK_PATH)
    .with_body(java_static_sdk_zip())
    .create_async()
    .await;
  let _v2 = server
    .mock("GET", "/staticjdk/labs-staticjdk-linux-gvm-2.0.zip")
    .with_body(java_static_sdk_zip())
    .create_async()
    .await;
  let env = TestEnv::new();
  let mut config = env.config("Hello");
  config.java_static_sdk_url = sdk_url_template(&server);
  let cache = DependencyCache::new(env.cache_root());

  for version in ["1.0", "2.0"] {
    config.java_static_sdk_version = version.to_string();
    cache
      .ensure(&BundleDescriptor::java_static_sdk(&config), Os::Linux, true)
      .await
      .unwrap();
  }

  config.java_static_sdk_version = "1.0".to_string();
  let v1 = BundleDescriptor::java_static_sdk(&config);
  assert_eq!(cache.stale_reason(&v1, Os::Linux, true), None);
  assert!(v1.checksum_map_path(&env.cache_root(), Os::Linux).is_file());
}
