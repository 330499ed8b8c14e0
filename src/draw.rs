/*
 *  draw.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Drawing helpers shared by the pages
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyleBuilder, Rectangle},
    text::{Baseline, Text},
};
use embedded_text::{
    alignment::{HorizontalAlignment, VerticalAlignment},
    style::TextBoxStyleBuilder,
    TextBox,
};

use crate::vframebuf::VarFrameBuf;

pub fn draw_text<D, C>(
    target: &mut D,
    text: &str,
    top_left: Point,
    font: &MonoFont,
    color: C,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = C>,
    C: PixelColor,
{
    Text::with_baseline(text, top_left, MonoTextStyle::new(font, color), Baseline::Top)
        .draw(target)?;
    Ok(())
}

/// Text laid out in a box `length` pixels wide, aligned within it.
pub fn draw_text_align<D, C>(
    target: &mut D,
    text: &str,
    top_left: Point,
    length: u32,
    align: HorizontalAlignment,
    font: &MonoFont,
    color: C,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = C>,
    C: PixelColor,
{
    let size = Size::new(length, font.character_size.height);
    let character_style = MonoTextStyle::new(font, color);
    let textbox_style = TextBoxStyleBuilder::new()
        .alignment(align)
        .vertical_alignment(VerticalAlignment::Middle)
        .build();
    TextBox::with_textbox_style(text, Rectangle::new(top_left, size), character_style, textbox_style)
        .draw(target)?;
    Ok(())
}

/// Mono font text blown up by an integer factor. The built-in fonts top
/// out at 20px, too small for the main readout across the room.
pub fn draw_text_scaled<D, C>(
    target: &mut D,
    text: &str,
    top_left: Point,
    font: &MonoFont,
    scale: u32,
    color: C,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = C>,
    C: PixelColor,
{
    let glyph = font.character_size;
    let chars = text.chars().count() as u32;
    if chars == 0 || scale == 0 {
        return Ok(());
    }
    let advance = glyph.width + font.character_spacing;
    let mut mask = VarFrameBuf::new(advance * chars, glyph.height, BinaryColor::Off);
    let _ = Text::with_baseline(text, Point::zero(), MonoTextStyle::new(font, BinaryColor::On), Baseline::Top)
        .draw(&mut mask);

    let block = Size::new(scale, scale);
    let s = scale as i32;
    for y in 0..mask.height() as i32 {
        for x in 0..mask.width() as i32 {
            if mask.pixel(x, y) == Some(BinaryColor::On) {
                let at = top_left + Point::new(x * s, y * s);
                target.fill_solid(&Rectangle::new(at, block), color)?;
            }
        }
    }
    Ok(())
}

pub fn draw_rectangle<D, C>(
    target: &mut D,
    top_left: Point,
    w: u32,
    h: u32,
    fill: C,
    border: Option<(u32, C)>,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = C>,
    C: PixelColor,
{
    let mut style = PrimitiveStyleBuilder::new().fill_color(fill);
    if let Some((width, color)) = border {
        style = style.stroke_color(color).stroke_width(width);
    }
    Rectangle::new(top_left, Size::new(w, h))
        .into_styled(style.build())
        .draw(target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::mono_font::ascii::FONT_6X10;
    use embedded_graphics::pixelcolor::Rgb565;

    fn lit(fb: &VarFrameBuf<Rgb565>, color: Rgb565) -> usize {
        fb.as_slice().iter().filter(|c| **c == color).count()
    }

    #[test]
    fn test_scaled_text_is_scale_squared() {
        let mut plain = VarFrameBuf::new(60, 30, Rgb565::BLACK);
        let mut big = VarFrameBuf::new(120, 60, Rgb565::BLACK);
        draw_text(&mut plain, "42", Point::zero(), &FONT_6X10, Rgb565::WHITE).unwrap();
        draw_text_scaled(&mut big, "42", Point::zero(), &FONT_6X10, 2, Rgb565::WHITE).unwrap();
        assert!(lit(&plain, Rgb565::WHITE) > 0);
        assert_eq!(lit(&big, Rgb565::WHITE), 4 * lit(&plain, Rgb565::WHITE));
    }

    #[test]
    fn test_right_aligned_text_hugs_the_edge() {
        let mut fb = VarFrameBuf::new(60, 10, Rgb565::BLACK);
        draw_text_align(&mut fb, "7", Point::zero(), 60, HorizontalAlignment::Right, &FONT_6X10, Rgb565::WHITE)
            .unwrap();
        let leftmost = (0..60)
            .find(|x| (0..10).any(|y| fb.pixel(*x, y) == Some(Rgb565::WHITE)))
            .unwrap();
        assert!(leftmost >= 50);
    }

    #[test]
    fn test_rectangle_with_border() {
        let mut fb = VarFrameBuf::new(10, 10, Rgb565::BLACK);
        draw_rectangle(&mut fb, Point::new(2, 2), 5, 5, Rgb565::GREEN, Some((1, Rgb565::RED))).unwrap();
        assert_eq!(fb.pixel(2, 2), Some(Rgb565::RED));
        assert_eq!(fb.pixel(4, 4), Some(Rgb565::GREEN));
        assert_eq!(fb.pixel(8, 8), Some(Rgb565::BLACK));
    }
}
