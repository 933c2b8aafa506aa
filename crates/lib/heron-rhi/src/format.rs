#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum TextureFormat {
    #[default]
    Unknown,

    RGBA8Unorm,
    BGRA8Unorm,
    RGBA16Float,
    RG16Float,
    R11G11B10Float,
    R32Float,
    R32Uint,

    D32Float,
    D24UnormS8Uint,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum RenderTargetFormat {
    #[default]
    Unknown,

    RGBA8Unorm,
    BGRA8Unorm,
    RGBA16Float,
    R11G11B10Float,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum DepthFormat {
    #[default]
    Unknown,

    D32Float,
    D24UnormS8Uint,
}

pub fn bytes_per_pixel(format: TextureFormat) -> u64 {
    match format {
        TextureFormat::Unknown => 0,
        TextureFormat::RGBA8Unorm | TextureFormat::BGRA8Unorm => 4,
        TextureFormat::RGBA16Float => 8,
        TextureFormat::RG16Float => 4,
        TextureFormat::R11G11B10Float => 4,
        TextureFormat::R32Float | TextureFormat::R32Uint => 4,
        TextureFormat::D32Float => 4,
        TextureFormat::D24UnormS8Uint => 4,
    }
}

pub fn is_depth_format(format: TextureFormat) -> bool {
    matches!(format, TextureFormat::D32Float | TextureFormat::D24UnormS8Uint)
}
