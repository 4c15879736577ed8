use std::path::Path;

use crate::media::{file_stem, GiphyClient, MediaLibrary, UnsplashClient, Visual, VisualKind};

/// Pairs one GIF and one photo per keyword
#[derive(Debug, Clone)]
pub struct StockMedia {
    giphy: GiphyClient,
    unsplash: UnsplashClient,
}

impl StockMedia {
    pub fn new(giphy: GiphyClient, unsplash: UnsplashClient) -> Self {
        Self { giphy, unsplash }
    }

    async fn fetch_gif(&self, keyword: &str, dir: &Path) -> Option<Visual> {
        let gifs = self
            .giphy
            .search(keyword, 1)
            .await
            .inspect_err(|e| tracing::error!(error = %e, keyword, "Error searching for GIF"))
            .ok()?;
        let gif = gifs.first()?;

        let path = dir.join(format!("{}_gif.gif", file_stem(keyword)));
        self.giphy
            .download(gif, &path)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, keyword, "Failed to download GIF"))
            .ok()?;

        Some(Visual {
            path,
            kind: VisualKind::Gif,
        })
    }

    async fn fetch_image(&self, keyword: &str, dir: &Path) -> Option<Visual> {
        let photos = self
            .unsplash
            .search(keyword, 1)
            .await
            .inspect_err(|e| tracing::error!(error = %e, keyword, "Error searching Unsplash"))
            .ok()?;
        let photo = photos.first()?;

        let path = dir.join(format!("{}_image.jpg", file_stem(keyword)));
        self.unsplash
            .download(photo, &path)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, keyword, "Failed to download image"))
            .ok()?;

        Some(Visual {
            path,
            kind: VisualKind::Image,
        })
    }
}

impl MediaLibrary for StockMedia {
    #[tracing::instrument(skip(self, dir))]
    async fn fetch_visuals(&self, keyword: &str, dir: &Path) -> Vec<Visual> {
        let (gif, image) = tokio::join!(
            self.fetch_gif(keyword, dir),
            self.fetch_image(keyword, dir)
        );
        gif.into_iter().chain(image).collect()
    }
}
