//! Packed `0x00RRGGBB` colors shared by the framebuffer, histogram and markers

pub const BLACK: u32 = rgb(0, 0, 0);
pub const WHITE: u32 = rgb(255, 255, 255);
pub const RED: u32 = rgb(255, 0, 0);
pub const GREEN: u32 = rgb(0, 255, 0);

// Roles
pub const SEPARATOR: u32 = RED;
pub const HISTOGRAM_BAR: u32 = WHITE;
pub const WRITE_HEAD: u32 = GREEN;

pub const fn rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Same intensity on all three channels
pub const fn gray(level: u8) -> u32 {
    rgb(level, level, level)
}

pub const fn channels(color: u32) -> (u8, u8, u8) {
    ((color >> 16) as u8, (color >> 8) as u8, color as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packing() {
        assert_eq!(RED, 0xFF0000);
        assert_eq!(gray(0x12), 0x121212);
        assert_eq!(channels(rgb(1, 2, 3)), (1, 2, 3));
    }
}
