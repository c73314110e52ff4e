//! View cache keyed by physical resource and view description

use crate::backend::{BackendResult, Device, PhysicalResource, ViewDescriptor, ViewHandle};

#[derive(Debug)]
struct CachedView {
    resource: PhysicalResource,
    desc: ViewDescriptor,
    view: ViewHandle,
}

/// De-duplicates views of aliased resources.
///
/// The cache stays small (a handful of views per live resource), so lookups
/// are a linear scan.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    views: Vec<CachedView>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached view for `(resource, desc)`, creating it on a miss.
    pub fn get_or_create(
        &mut self,
        device: &mut dyn Device,
        resource: PhysicalResource,
        desc: &ViewDescriptor,
    ) -> BackendResult<ViewHandle> {
        if let Some(cached) = self
            .views
            .iter()
            .find(|cached| cached.resource == resource && cached.desc == *desc)
        {
            return Ok(cached.view);
        }

        let view = device.create_view(resource, desc)?;
        self.views.push(CachedView {
            resource,
            desc: *desc,
            view,
        });
        Ok(view)
    }

    /// Destroy every cached view of `resource`. Returns how many were destroyed.
    pub fn delete(&mut self, device: &mut dyn Device, resource: PhysicalResource) -> usize {
        let before = self.views.len();
        self.views.retain(|cached| {
            if cached.resource == resource {
                device.destroy_view(cached.view);
                false
            } else {
                true
            }
        });
        before - self.views.len()
    }

    pub fn contains(&self, view: ViewHandle) -> bool {
        self.views.iter().any(|cached| cached.view == view)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Destroy every cached view.
    pub fn clear(&mut self, device: &mut dyn Device) {
        for cached in self.views.drain(..) {
            device.destroy_view(cached.view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyDevice, ResourceState, TextureDescriptor};

    fn texture(device: &mut DummyDevice) -> PhysicalResource {
        let texture = device
            .create_texture(&TextureDescriptor::default(), ResourceState::Undefined, "t")
            .unwrap();
        PhysicalResource::Texture(texture)
    }

    #[test]
    fn test_same_key_returns_same_view() {
        let mut device = DummyDevice::new();
        let resource = texture(&mut device);
        let mut cache = DescriptorCache::new();

        let first = cache
            .get_or_create(&mut device, resource, &ViewDescriptor::shader_read())
            .unwrap();
        let second = cache
            .get_or_create(&mut device, resource, &ViewDescriptor::shader_read())
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(device.stats().views_created, 1);
    }

    #[test]
    fn test_different_descriptions_get_different_views() {
        let mut device = DummyDevice::new();
        let resource = texture(&mut device);
        let mut cache = DescriptorCache::new();

        let read = cache
            .get_or_create(&mut device, resource, &ViewDescriptor::shader_read())
            .unwrap();
        let write = cache
            .get_or_create(&mut device, resource, &ViewDescriptor::read_write())
            .unwrap();

        assert_ne!(read, write);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_delete_only_touches_one_resource() {
        let mut device = DummyDevice::new();
        let a = texture(&mut device);
        let b = texture(&mut device);
        let mut cache = DescriptorCache::new();

        let view_a = cache
            .get_or_create(&mut device, a, &ViewDescriptor::shader_read())
            .unwrap();
        let view_b = cache
            .get_or_create(&mut device, b, &ViewDescriptor::shader_read())
            .unwrap();

        assert_eq!(cache.delete(&mut device, a), 1);
        assert!(!cache.contains(view_a));
        assert!(!device.is_view_alive(view_a));
        assert!(cache.contains(view_b));
        assert!(device.is_view_alive(view_b));
    }
}
