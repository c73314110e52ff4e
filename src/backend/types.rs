//! Common types shared between the frame graph and device implementations

use bitflags::bitflags;

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    R8Unorm,
    R16Float,
    R32Float,
    R32Uint,
    Rg16Float,
    Rg32Float,
    #[default]
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Rgb10A2Unorm,
    Rg11B10Float,
    Rgba16Float,
    Rgba32Float,
    Depth16Unorm,
    Depth32Float,
    Depth24PlusStencil8,
    Depth32FloatStencil8,
}

impl TextureFormat {
    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16Unorm
                | TextureFormat::Depth32Float
                | TextureFormat::Depth24PlusStencil8
                | TextureFormat::Depth32FloatStencil8
        )
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm => 1,
            TextureFormat::R16Float | TextureFormat::Depth16Unorm => 2,
            TextureFormat::R32Float
            | TextureFormat::R32Uint
            | TextureFormat::Rg16Float
            | TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Rgb10A2Unorm
            | TextureFormat::Rg11B10Float
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::Rg32Float
            | TextureFormat::Rgba16Float
            | TextureFormat::Depth32FloatStencil8 => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be copied from.
        const COPY_SRC = 1 << 0;
        /// Texture can be copied to.
        const COPY_DST = 1 << 1;
        /// Texture can be sampled in a shader.
        const TEXTURE_BINDING = 1 << 2;
        /// Texture can be read and written as a storage texture.
        const STORAGE_BINDING = 1 << 3;
        /// Texture can be used as a color or depth attachment.
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const VERTEX = 1 << 2;
        const INDEX = 1 << 3;
        const UNIFORM = 1 << 4;
        /// Buffer can be read and written from shaders.
        const STORAGE = 1 << 5;
        /// Buffer can hold indirect dispatch/draw arguments.
        const INDIRECT = 1 << 6;
    }
}

/// Texture descriptor
///
/// Two descriptors are interchangeable for aliasing purposes only when they
/// compare equal, so the debug name is kept outside of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub depth_or_layers: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Create a single-mip 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            width,
            height,
            depth_or_layers: 1,
            mip_levels: 1,
            format,
            usage,
        }
    }

    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    pub fn with_layers(mut self, layers: u32) -> Self {
        self.depth_or_layers = layers;
        self
    }

    /// Whether the texture can only be placed in a render-target heap.
    pub fn is_render_target(&self) -> bool {
        self.format.is_depth_stencil() || self.usage.contains(TextureUsage::RENDER_ATTACHMENT)
    }

    /// Number of addressable subresources (mips times layers).
    pub fn subresource_count(&self) -> u32 {
        self.mip_levels * self.depth_or_layers
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self::new_2d(
            1,
            1,
            TextureFormat::Rgba8Unorm,
            TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        )
    }
}

/// Buffer descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferDescriptor {
    pub size: u64,
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self { size, usage }
    }
}

/// Description of either kind of resource the graph can create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceDescriptor {
    Texture(TextureDescriptor),
    Buffer(BufferDescriptor),
}

impl ResourceDescriptor {
    pub fn heap_kind(&self) -> HeapKind {
        match self {
            ResourceDescriptor::Buffer(_) => HeapKind::Buffers,
            ResourceDescriptor::Texture(desc) if desc.is_render_target() => HeapKind::RenderTargets,
            ResourceDescriptor::Texture(_) => HeapKind::Textures,
        }
    }

    pub fn as_texture(&self) -> Option<&TextureDescriptor> {
        match self {
            ResourceDescriptor::Texture(desc) => Some(desc),
            ResourceDescriptor::Buffer(_) => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&BufferDescriptor> {
        match self {
            ResourceDescriptor::Buffer(desc) => Some(desc),
            ResourceDescriptor::Texture(_) => None,
        }
    }
}

/// Which class of resources a heap may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapKind {
    Buffers,
    Textures,
    /// Color and depth/stencil targets
    RenderTargets,
}

/// Heap descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapDescriptor {
    pub size: u64,
    pub kind: HeapKind,
}

/// The access a resource must be in for an operation to be valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceState {
    /// Contents are undefined and may be discarded.
    #[default]
    Undefined,
    Common,
    ShaderRead,
    UnorderedAccess,
    RenderTarget,
    DepthWrite,
    DepthRead,
    IndirectArgument,
    VertexOrUniform,
    IndexBuffer,
    CopySrc,
    CopyDst,
    /// Ready to be handed off to the presentation engine.
    Present,
}

impl ResourceState {
    pub fn name(self) -> &'static str {
        match self {
            ResourceState::Undefined => "undefined",
            ResourceState::Common => "common",
            ResourceState::ShaderRead => "shader-read",
            ResourceState::UnorderedAccess => "unordered-access",
            ResourceState::RenderTarget => "render-target",
            ResourceState::DepthWrite => "depth-write",
            ResourceState::DepthRead => "depth-read",
            ResourceState::IndirectArgument => "indirect-argument",
            ResourceState::VertexOrUniform => "vertex-or-uniform",
            ResourceState::IndexBuffer => "index-buffer",
            ResourceState::CopySrc => "copy-src",
            ResourceState::CopyDst => "copy-dst",
            ResourceState::Present => "present",
        }
    }
}

/// Part of a resource an access applies to.
///
/// Texture subresources are numbered `mip + layer * mip_levels`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Subresource {
    #[default]
    All,
    Index(u32),
}

/// Hardware queue a pass is submitted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueueType {
    #[default]
    Graphics,
    Compute,
    Copy,
}

/// Handle to a device heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapHandle(pub u64);

/// Handle to a device texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to a device buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a shader-read or read/write view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u64);

/// A device resource backing a logical graph resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalResource {
    Texture(TextureHandle),
    Buffer(BufferHandle),
}

impl PhysicalResource {
    pub fn as_texture(&self) -> Option<TextureHandle> {
        match self {
            PhysicalResource::Texture(texture) => Some(*texture),
            PhysicalResource::Buffer(_) => None,
        }
    }

    pub fn as_buffer(&self) -> Option<BufferHandle> {
        match self {
            PhysicalResource::Buffer(buffer) => Some(*buffer),
            PhysicalResource::Texture(_) => None,
        }
    }
}

/// Kind of view to create over a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    ShaderRead,
    ReadWrite,
    RenderTarget,
    DepthStencil,
}

/// View description, the key of the view cache together with the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewDescriptor {
    pub kind: ViewKind,
    /// Reinterpretation format, `None` keeps the resource format.
    pub format: Option<TextureFormat>,
    pub base_mip: u32,
    /// Mip count, `None` covers every mip from `base_mip`.
    pub mip_count: Option<u32>,
    pub base_layer: u32,
    pub layer_count: Option<u32>,
}

impl ViewDescriptor {
    fn whole(kind: ViewKind) -> Self {
        Self {
            kind,
            format: None,
            base_mip: 0,
            mip_count: None,
            base_layer: 0,
            layer_count: None,
        }
    }

    /// Full-resource shader-read view.
    pub fn shader_read() -> Self {
        Self::whole(ViewKind::ShaderRead)
    }

    /// Full-resource read/write view.
    pub fn read_write() -> Self {
        Self::whole(ViewKind::ReadWrite)
    }

    pub fn render_target() -> Self {
        Self::whole(ViewKind::RenderTarget)
    }

    pub fn depth_stencil() -> Self {
        Self::whole(ViewKind::DepthStencil)
    }

    /// Restrict the view to a single mip.
    pub fn with_mip(mut self, mip: u32) -> Self {
        self.base_mip = mip;
        self.mip_count = Some(1);
        self
    }

    pub fn with_layers(mut self, base_layer: u32, layer_count: u32) -> Self {
        self.base_layer = base_layer;
        self.layer_count = Some(layer_count);
        self
    }
}
