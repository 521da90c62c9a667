//! Unit tests for the download orchestration

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use comic_downloader::{
    AlbumDetail, ComicDownloaderError, CountdownHooks, Downloader, DownloadHooks, DryRunHooks,
    ImageDetail, PhotoDetail,
};
use common::{sample_album, test_option, StubClient};

fn dry_run_downloader(album: AlbumDetail, base: &TempDir) -> Downloader {
    Downloader::new(test_option(base.path()))
        .with_client(Arc::new(StubClient::with_album(album)))
        .with_hooks(Arc::new(DryRunHooks))
}

#[tokio::test]
async fn test_downloader_init() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));

    assert_eq!(downloader.tracker().album_count(), 0);
    assert_eq!(downloader.tracker().failed_image_count(), 0);
    assert_eq!(downloader.tracker().failed_photo_count(), 0);
}

#[tokio::test]
async fn test_download_album() {
    let base = TempDir::new().unwrap();
    let downloader = dry_run_downloader(sample_album("438516", 2, 3), &base);

    let album = downloader.download_album("438516").await.unwrap();

    assert_eq!(album.album_id, "438516");
    assert!(downloader.tracker().contains_album("438516"));
}

#[tokio::test]
async fn test_download_photo() {
    let base = TempDir::new().unwrap();
    let downloader = dry_run_downloader(sample_album("438516", 2, 3), &base);

    let photo = downloader.download_photo("438516-1").await.unwrap();

    assert_eq!(photo.photo_id, "438516-1");
    // tracked under the album the photo links back to
    assert!(downloader.tracker().contains_album("438516"));
    assert!(downloader.tracker().contains_photo("438516", "438516-1"));
}

#[tokio::test]
async fn test_download_by_album_detail() {
    let base = TempDir::new().unwrap();
    let album = sample_album("438516", 2, 3);
    let downloader = dry_run_downloader(album.clone(), &base);

    downloader.download_by_album_detail(&album).await.unwrap();

    assert!(downloader.tracker().contains_album("438516"));
    assert!(downloader.all_success());
}

#[tokio::test]
async fn test_download_by_album_detail_skip() {
    let base = TempDir::new().unwrap();
    let mut album = sample_album("438516", 2, 3);
    let downloader = dry_run_downloader(album.clone(), &base);
    album.skip = true;

    downloader.download_by_album_detail(&album).await.unwrap();

    assert!(!downloader.tracker().contains_album("438516"));
}

#[tokio::test]
async fn test_download_by_photo_detail() {
    let base = TempDir::new().unwrap();
    let album = sample_album("438516", 2, 3);
    let downloader = dry_run_downloader(album.clone(), &base);

    downloader
        .download_by_photo_detail(&album.photos[0])
        .await
        .unwrap();

    assert!(downloader.tracker().contains_album("438516"));
    assert!(downloader.tracker().contains_photo("438516", "438516-1"));
    assert_eq!(downloader.tracker().images_of("438516", "438516-1").len(), 3);
}

#[tokio::test]
async fn test_download_by_photo_detail_skip() {
    let base = TempDir::new().unwrap();
    let album = sample_album("438516", 2, 3);
    let downloader = dry_run_downloader(album.clone(), &base);

    let mut photo = album.photos[0].clone();
    photo.skip = true;
    downloader.download_by_photo_detail(&photo).await.unwrap();

    assert!(!downloader.tracker().contains_photo("438516", "438516-1"));
}

#[tokio::test]
async fn test_download_by_image_detail() {
    let base = TempDir::new().unwrap();
    let album = sample_album("438516", 1, 1);
    let downloader = Downloader::new(test_option(base.path()))
        .with_client(Arc::new(StubClient::with_album(album.clone())));

    let photo = &album.photos[0];
    downloader.before_photo(photo);
    downloader
        .download_by_image_detail(&album, photo, &photo.images[0])
        .await
        .unwrap();

    let images = downloader.tracker().images_of("438516", "438516-1");
    assert_eq!(images.len(), 1);
    assert!(images[0].0.exists());
    assert_eq!(images[0].1, "00001.jpg");
}

#[tokio::test]
async fn test_download_by_image_detail_skip() {
    let base = TempDir::new().unwrap();
    let album = sample_album("438516", 1, 1);
    let downloader = Downloader::new(test_option(base.path()))
        .with_client(Arc::new(StubClient::with_album(album.clone())));

    let photo = &album.photos[0];
    let mut image = photo.images[0].clone();
    image.skip = true;

    downloader
        .download_by_image_detail(&album, photo, &image)
        .await
        .unwrap();

    assert!(downloader.tracker().images_of("438516", "438516-1").is_empty());
}

#[tokio::test]
async fn test_download_by_image_detail_cache() {
    let base = TempDir::new().unwrap();
    let album = sample_album("438516", 1, 1);
    let mut option = test_option(base.path());
    option.download.cache = true;

    // The stub refuses this image; only the cache can satisfy the download.
    let client = StubClient::with_album(album.clone()).failing_images(&["00001"]);
    let downloader = Downloader::new(option.clone()).with_client(Arc::new(client));

    let photo = &album.photos[0];
    let save_path = option
        .decide_image_filepath(&album, photo, &photo.images[0])
        .unwrap();
    comic_downloader::utils::save_bytes(&save_path, b"cached").unwrap();

    downloader.before_photo(photo);
    downloader
        .download_by_image_detail(&album, photo, &photo.images[0])
        .await
        .unwrap();

    // cache hit counted as success, no transfer attempted
    assert_eq!(downloader.tracker().failed_image_count(), 0);
    assert_eq!(downloader.tracker().images_of("438516", "438516-1").len(), 1);
}

/// Policy that only keeps the first photo of every album.
struct FirstPhotoOnly;

impl DownloadHooks for FirstPhotoOnly {
    fn filter_album(&self, mut album: AlbumDetail) -> AlbumDetail {
        album.photos.truncate(1);
        album
    }

    fn should_download(&self, _image: &ImageDetail) -> bool {
        false
    }
}

#[tokio::test]
async fn test_filter_album_custom() {
    let base = TempDir::new().unwrap();
    let album = sample_album("438516", 3, 2);
    let downloader = Downloader::new(test_option(base.path()))
        .with_client(Arc::new(StubClient::with_album(album.clone())))
        .with_hooks(Arc::new(FirstPhotoOnly));

    downloader.download_by_album_detail(&album).await.unwrap();

    assert!(downloader.tracker().contains_photo("438516", "438516-1"));
    assert!(!downloader.tracker().contains_photo("438516", "438516-2"));
    assert!(!downloader.tracker().contains_photo("438516", "438516-3"));
}

#[tokio::test]
async fn test_before_album_registers_tracker() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));
    let album = sample_album("438516", 2, 3);

    downloader.before_album(&album);

    assert!(downloader.tracker().contains_album("438516"));
}

#[tokio::test]
async fn test_after_album_keeps_tracker() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));
    let album = sample_album("438516", 2, 3);

    downloader.before_album(&album);
    downloader.after_album(&album);

    assert!(downloader.tracker().contains_album("438516"));
}

#[tokio::test]
async fn test_before_photo_registers_album_and_photo() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));
    let album = sample_album("438516", 2, 3);

    downloader.before_photo(&album.photos[0]);

    assert!(downloader.tracker().contains_album("438516"));
    assert!(downloader.tracker().contains_photo("438516", "438516-1"));
}

#[tokio::test]
async fn test_after_image_records_pair() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));
    let album = sample_album("438516", 1, 3);
    let photo = &album.photos[0];

    downloader.before_photo(photo);
    let save_path = base.path().join("00001.jpg");
    downloader.after_image(&photo.images[0], &save_path);

    let images = downloader.tracker().images_of("438516", "438516-1");
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].0, save_path);
    assert_eq!(images[0].1, "00001.jpg");
}

#[tokio::test]
async fn test_raise_if_has_exception_no_failures() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));

    assert!(downloader.raise_if_has_exception().is_ok());
}

#[tokio::test]
async fn test_raise_if_has_exception_with_image_failure() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));
    let album = sample_album("438516", 1, 1);

    downloader.tracker().record_image_failure(
        album.photos[0].images[0].clone(),
        ComicDownloaderError::HttpError("test error".to_string()),
    );

    let err = downloader.raise_if_has_exception().unwrap_err();
    assert!(matches!(
        err,
        ComicDownloaderError::PartialDownloadFailed(_)
    ));
    // repeated calls still report (pure read)
    assert!(downloader.raise_if_has_exception().is_err());
}

#[tokio::test]
async fn test_raise_if_has_exception_with_photo_failure() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));
    let album = sample_album("438516", 1, 1);

    downloader.tracker().record_photo_failure(
        album.photos[0].clone(),
        ComicDownloaderError::DownloadError("test error".to_string()),
    );

    assert!(matches!(
        downloader.raise_if_has_exception(),
        Err(ComicDownloaderError::PartialDownloadFailed(_))
    ));
}

#[tokio::test]
async fn test_has_download_failures() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));
    assert!(!downloader.has_download_failures());

    downloader.tracker().record_image_failure(
        ImageDetail::default(),
        ComicDownloaderError::HttpError("test".to_string()),
    );
    assert!(downloader.has_download_failures());
}

#[tokio::test]
async fn test_all_success_no_downloads() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));

    assert!(downloader.all_success());
}

#[tokio::test]
async fn test_all_success_partial_download() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));
    let album = sample_album("438516", 2, 3);

    // registered but no image ever completed
    downloader.before_album(&album);
    downloader.before_photo(&album.photos[0]);

    assert!(!downloader.all_success());
}

#[tokio::test]
async fn test_worker_failure_is_captured_not_propagated() {
    let base = TempDir::new().unwrap();
    let album = sample_album("438516", 1, 3);
    let client = StubClient::with_album(album.clone()).failing_images(&["00002"]);
    let downloader =
        Downloader::new(test_option(base.path())).with_client(Arc::new(client));

    // traversal itself succeeds, the leaf error lands in the failure list
    downloader.download_by_album_detail(&album).await.unwrap();

    assert_eq!(downloader.tracker().failed_image_count(), 1);
    assert_eq!(downloader.tracker().images_of("438516", "438516-1").len(), 2);
    assert!(!downloader.all_success());
    assert!(downloader.raise_if_has_exception().is_err());
}

#[tokio::test]
async fn test_photo_refetch_failure_recorded() {
    let base = TempDir::new().unwrap();
    let mut album = sample_album("438516", 1, 2);
    let downloader = dry_run_downloader(album.clone(), &base);
    // photo stub whose detail the stub client does not know
    album.photos.push(PhotoDetail {
        photo_id: "missing".to_string(),
        from_album: Some("438516".to_string()),
        ..Default::default()
    });

    downloader.download_by_album_detail(&album).await.unwrap();

    assert_eq!(downloader.tracker().failed_photo_count(), 1);
    assert!(!downloader.all_success());
}

#[tokio::test]
async fn test_scope_passes_value_through() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));

    let value = downloader.scope(async { Ok(42) }).await.unwrap();
    assert_eq!(value, 42);
}

#[tokio::test]
async fn test_scope_logs_but_propagates_error() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));

    let result: Result<(), _> = downloader
        .scope(async {
            Err(ComicDownloaderError::DownloadError(
                "test exception".to_string(),
            ))
        })
        .await;

    assert!(matches!(
        result,
        Err(ComicDownloaderError::DownloadError(_))
    ));
}

#[tokio::test]
async fn test_execute_on_condition_empty() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    downloader
        .execute_on_condition(
            Vec::<usize>::new(),
            move |_item| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
            10,
        )
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_execute_on_condition_sequential_mode() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    downloader
        .execute_on_condition(
            vec![1, 2, 3],
            move |_item| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
            1000,
        )
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_execute_on_condition_pool_mode() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    downloader
        .execute_on_condition(
            (0..20).collect::<Vec<usize>>(),
            move |_item| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
            1,
        )
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 20);
}

#[tokio::test]
async fn test_standalone_photo_uses_album_name_in_path() {
    let base = TempDir::new().unwrap();
    let album = sample_album("438516", 2, 1);
    let mut option = test_option(base.path());
    option.dir_rule.rule = "Bd_Aname_Pindex".to_string();
    let downloader = Downloader::new(option)
        .with_client(Arc::new(StubClient::with_album(album.clone())))
        .with_hooks(Arc::new(DryRunHooks));

    downloader
        .download_by_photo_detail(&album.photos[0])
        .await
        .unwrap();

    // the Aname segment resolves to the album's name, not the photo's
    let saved = downloader.tracker().images_of("438516", "438516-1");
    assert_eq!(saved.len(), 1);
    let path = saved[0].0.to_string_lossy().into_owned();
    assert!(path.contains("测试本子"), "path was {}", path);
    assert!(!path.contains("第1话"), "path was {}", path);
}

#[tokio::test]
async fn test_standalone_photo_unknown_album_falls_back() {
    let base = TempDir::new().unwrap();
    let album = sample_album("438516", 1, 1);
    let downloader = dry_run_downloader(album.clone(), &base);

    let mut photo = album.photos[0].clone();
    photo.from_album = Some("999999".to_string());
    downloader.download_by_photo_detail(&photo).await.unwrap();

    // album lookup fails, the photo still downloads under the linked id
    assert!(downloader.tracker().contains_photo("999999", "438516-1"));
    assert_eq!(downloader.tracker().images_of("999999", "438516-1").len(), 1);
}

#[tokio::test]
async fn test_download_empty_album() {
    let base = TempDir::new().unwrap();
    let album = sample_album("438516", 0, 0);
    let downloader = dry_run_downloader(album.clone(), &base);

    downloader.download_by_album_detail(&album).await.unwrap();

    // hooks still bracket the album, dispatch is a no-op
    assert!(downloader.tracker().contains_album("438516"));
    assert!(downloader.all_success());
    assert!(downloader.raise_if_has_exception().is_ok());
}

#[tokio::test]
async fn test_download_photo_without_images() {
    let base = TempDir::new().unwrap();
    let album = sample_album("438516", 1, 0);
    let downloader = dry_run_downloader(album.clone(), &base);

    downloader
        .download_by_photo_detail(&album.photos[0])
        .await
        .unwrap();

    assert!(downloader.tracker().contains_photo("438516", "438516-1"));
    assert!(downloader.all_success());
}

#[tokio::test]
async fn test_execute_on_condition_zero_threshold() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    // threshold 0 still runs every item, through a pool of one worker
    downloader
        .execute_on_condition(
            vec![1, 2, 3],
            move |_item| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
            0,
        )
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_after_image_unlinked_tracks_under_filename() {
    let base = TempDir::new().unwrap();
    let downloader = Downloader::new(test_option(base.path()));

    let mut image = sample_album("438516", 1, 1).photos[0].images[0].clone();
    image.from_photo = None;
    downloader.after_image(&image, &base.path().join("00001.jpg"));

    assert!(!downloader.tracker().contains_album(""));
    assert_eq!(
        downloader.tracker().images_of("00001.jpg", "00001.jpg").len(),
        1
    );
}

#[tokio::test]
async fn test_dry_run_creates_no_files() {
    let base = TempDir::new().unwrap();
    let album = sample_album("438516", 1, 3);
    let downloader = dry_run_downloader(album.clone(), &base);

    downloader.download_by_album_detail(&album).await.unwrap();

    // tree is walked and tracked, but nothing is written
    assert!(downloader.all_success());
    let saved = downloader.tracker().images_of("438516", "438516-1");
    assert_eq!(saved.len(), 3);
    for (path, _) in saved {
        assert!(!path.exists());
    }
}

#[tokio::test]
async fn test_countdown_limits_downloads() {
    let base = TempDir::new().unwrap();
    let album = sample_album("438516", 1, 3);
    let hooks = CountdownHooks::new(2);
    let downloader = Downloader::new(test_option(base.path()))
        .with_client(Arc::new(StubClient::with_album(album.clone())))
        .with_hooks(Arc::new(hooks.clone()));

    downloader.download_by_album_detail(&album).await.unwrap();

    assert_eq!(downloader.tracker().images_of("438516", "438516-1").len(), 2);
    assert_eq!(downloader.tracker().failed_image_count(), 0);
    assert_eq!(hooks.remaining(), -1);
    // the third image was never attempted, so the photo is incomplete
    assert!(!downloader.all_success());
}
