//! Named textures that arrive asynchronously
//!
//! Materials refer to textures by key. A key is requested up front, receives
//! decoded pixels (or a failure) from the asset loader later, and is uploaded
//! by the render engine on the next frame. Until then, and forever when the
//! load failed, lookups fall back to a 1x1 white texture that materials
//! scale to black.

use std::collections::HashMap;

use crate::assets::TextureData;

use super::texture_resource::TextureResource;

/// How texel values are interpreted when sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Colour images, decoded to linear by the sampler
    Srgb,
    /// Data images such as height maps
    Linear,
}

impl ColorSpace {
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureStatus {
    Missing,
    Pending,
    Ready,
    Failed,
}

enum TextureState {
    Pending,
    Decoded(TextureData),
    Ready(TextureResource),
    Failed,
}

struct TextureEntry {
    color_space: ColorSpace,
    state: TextureState,
}

#[derive(Default)]
pub struct TextureLibrary {
    entries: HashMap<String, TextureEntry>,
    fallback: Option<TextureResource>,
}

impl TextureLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a key that will be filled later
    pub fn request(&mut self, key: &str, color_space: ColorSpace) {
        self.entries
            .entry(key.to_string())
            .or_insert(TextureEntry {
                color_space,
                state: TextureState::Pending,
            });
    }

    /// Stores decoded pixels; unrequested keys are treated as sRGB
    pub fn insert(&mut self, key: &str, data: TextureData) {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert(TextureEntry {
                color_space: ColorSpace::Srgb,
                state: TextureState::Pending,
            });
        entry.state = TextureState::Decoded(data);
    }

    pub fn mark_failed(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.state = TextureState::Failed;
        }
    }

    pub fn status(&self, key: &str) -> TextureStatus {
        match self.entries.get(key).map(|e| &e.state) {
            None => TextureStatus::Missing,
            Some(TextureState::Pending) | Some(TextureState::Decoded(_)) => TextureStatus::Pending,
            Some(TextureState::Ready(_)) => TextureStatus::Ready,
            Some(TextureState::Failed) => TextureStatus::Failed,
        }
    }

    pub fn is_ready(&self, key: &str) -> bool {
        self.status(key) == TextureStatus::Ready
    }

    /// Number of keys in each of the pending, ready and failed states
    pub fn counts(&self) -> (usize, usize, usize) {
        self.entries
            .values()
            .fold((0, 0, 0), |(pending, ready, failed), entry| match entry.state {
                TextureState::Pending | TextureState::Decoded(_) => (pending + 1, ready, failed),
                TextureState::Ready(_) => (pending, ready + 1, failed),
                TextureState::Failed => (pending, ready, failed + 1),
            })
    }

    /// Creates the fallback texture and uploads every decoded image
    ///
    /// Returns the number of textures uploaded by this call.
    pub fn upload_pending(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> usize {
        if self.fallback.is_none() {
            self.fallback = Some(TextureResource::from_texture_data(
                device,
                queue,
                &TextureData::solid([255, 255, 255, 255]),
                wgpu::TextureFormat::Rgba8Unorm,
                "Fallback White",
            ));
        }

        let mut uploaded = 0;
        for (key, entry) in self.entries.iter_mut() {
            if let TextureState::Decoded(data) = &entry.state {
                let resource = TextureResource::from_texture_data(
                    device,
                    queue,
                    data,
                    entry.color_space.texture_format(),
                    key,
                );
                log::debug!("Uploaded texture '{}' ({}x{})", key, data.width, data.height);
                entry.state = TextureState::Ready(resource);
                uploaded += 1;
            }
        }
        uploaded
    }

    /// Uploaded texture for `key`, or the fallback
    pub fn resource(&self, key: Option<&str>) -> Option<&TextureResource> {
        let uploaded = key
            .and_then(|k| self.entries.get(k))
            .and_then(|entry| match &entry.state {
                TextureState::Ready(resource) => Some(resource),
                _ => None,
            });
        uploaded.or(self.fallback.as_ref())
    }
}
