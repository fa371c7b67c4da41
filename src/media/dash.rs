//! MPEG-DASH manifest decoding and representation ranking.

use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(rename = "Period", default)]
    periods: Vec<Period>,
}

#[derive(Debug, Default, Deserialize)]
struct Period {
    #[serde(rename = "AdaptationSet", default)]
    adaptation_sets: Vec<AdaptationSet>,
}

#[derive(Debug, Default, Deserialize)]
struct AdaptationSet {
    #[serde(rename = "@mimeType", default)]
    mime_type: String,
    #[serde(rename = "@contentType", default)]
    content_type: String,
    #[serde(rename = "Representation", default)]
    representations: Vec<Representation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Representation {
    #[serde(rename = "@width", default)]
    width: u32,
    #[serde(rename = "@height", default)]
    height: u32,
    #[serde(rename = "@bandwidth", default)]
    bandwidth: u64,
    #[serde(rename = "BaseURL", default)]
    base_url: String,
}

impl AdaptationSet {
    /// Absent attributes do not exclude a set.
    fn is_video(&self) -> bool {
        let content_type = self.content_type.trim().to_ascii_lowercase();
        let mime_type = self.mime_type.trim().to_ascii_lowercase();
        (content_type.is_empty() || content_type == "video")
            && (mime_type.is_empty() || mime_type.contains("video"))
    }
}

impl Representation {
    fn has_progressive_url(&self) -> bool {
        let url = self.base_url.trim().to_ascii_lowercase();
        !url.is_empty() && (url.contains(".mp4") || url.contains("mime=video"))
    }
}

/// Picks the highest-quality progressive URL from a manifest.
///
/// Ranking is height, then width, then bandwidth, all descending; ties keep
/// document order. Returns `None` for malformed manifests and manifests
/// without a usable video representation.
pub(crate) fn best_from_dash(manifest: &str) -> Option<String> {
    let manifest: Manifest = match quick_xml::de::from_str(manifest.trim()) {
        Ok(manifest) => manifest,
        Err(error) => {
            debug!(%error, "ignoring malformed DASH manifest");
            return None;
        }
    };

    let mut representations: Vec<Representation> = manifest
        .periods
        .into_iter()
        .flat_map(|period| period.adaptation_sets)
        .filter(AdaptationSet::is_video)
        .flat_map(|set| set.representations)
        .filter(Representation::has_progressive_url)
        .collect();

    representations.sort_by(|a, b| {
        b.height
            .cmp(&a.height)
            .then(b.width.cmp(&a.width))
            .then(b.bandwidth.cmp(&a.bandwidth))
    });

    representations
        .into_iter()
        .next()
        .map(|best| best.base_url.trim().to_string())
        .filter(|url| !url.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(sets: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static">
  <Period id="0" duration="PT12.5S">{sets}</Period>
</MPD>"#
        )
    }

    #[test]
    fn test_best_from_dash_picks_highest_resolution() {
        let xml = manifest(
            r#"<AdaptationSet id="0" contentType="video" mimeType="video/mp4">
                 <Representation id="a" width="1280" height="720" bandwidth="500">
                   <BaseURL>https://cdn.example/a.mp4</BaseURL>
                   <SegmentBase indexRange="0-100"><Initialization range="0-50"/></SegmentBase>
                 </Representation>
                 <Representation id="b" width="1920" height="1080" bandwidth="800">
                   <BaseURL>https://cdn.example/b.mp4</BaseURL>
                 </Representation>
               </AdaptationSet>"#,
        );
        assert_eq!(
            best_from_dash(&xml).as_deref(),
            Some("https://cdn.example/b.mp4")
        );
    }

    #[test]
    fn test_best_from_dash_ignores_audio_sets() {
        let xml = manifest(
            r#"<AdaptationSet contentType="audio" mimeType="audio/mp4">
                 <Representation width="4000" height="4000" bandwidth="9">
                   <BaseURL>https://cdn.example/audio.mp4</BaseURL>
                 </Representation>
               </AdaptationSet>
               <AdaptationSet contentType="video">
                 <Representation width="640" height="360" bandwidth="1">
                   <BaseURL>https://cdn.example/small.mp4</BaseURL>
                 </Representation>
               </AdaptationSet>"#,
        );
        assert_eq!(
            best_from_dash(&xml).as_deref(),
            Some("https://cdn.example/small.mp4")
        );
    }

    #[test]
    fn test_best_from_dash_missing_attributes_are_permissive() {
        let xml = manifest(
            r#"<AdaptationSet>
                 <Representation height="480">
                   <BaseURL>https://cdn.example/v?mime=video_mp4&amp;x=1</BaseURL>
                 </Representation>
               </AdaptationSet>"#,
        );
        assert_eq!(
            best_from_dash(&xml).as_deref(),
            Some("https://cdn.example/v?mime=video_mp4&x=1")
        );
    }

    #[test]
    fn test_best_from_dash_requires_progressive_url() {
        let xml = manifest(
            r#"<AdaptationSet contentType="video">
                 <Representation width="1920" height="1080">
                   <BaseURL>https://cdn.example/segment.m4s</BaseURL>
                 </Representation>
               </AdaptationSet>"#,
        );
        assert_eq!(best_from_dash(&xml), None);
    }

    #[test]
    fn test_best_from_dash_bandwidth_breaks_ties() {
        let xml = manifest(
            r#"<AdaptationSet contentType="video">
                 <Representation width="720" height="1280" bandwidth="100">
                   <BaseURL>https://cdn.example/low.mp4</BaseURL>
                 </Representation>
                 <Representation width="720" height="1280" bandwidth="900">
                   <BaseURL>https://cdn.example/high.mp4</BaseURL>
                 </Representation>
               </AdaptationSet>"#,
        );
        assert_eq!(
            best_from_dash(&xml).as_deref(),
            Some("https://cdn.example/high.mp4")
        );
    }

    #[test]
    fn test_best_from_dash_malformed_is_none() {
        assert_eq!(best_from_dash("<MPD><Period>"), None);
        assert_eq!(best_from_dash("not xml at all"), None);
        assert_eq!(best_from_dash(""), None);
    }
}
