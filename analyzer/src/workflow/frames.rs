use anyhow::{bail, ensure, Context};
use ndarray::Array2;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;

const FRAME_EXTENSIONS: [&str; 3] = ["png", "tif", "tiff"];

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn is_frame_file(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn is_tiff(path: &Path) -> bool {
    matches!(extension_of(path).as_deref(), Some("tif" | "tiff"))
}

/// Sort key splitting the file stem around its last run of digits, so
/// `frame_2` sorts before `frame_10`.
fn frame_order_key(path: &Path) -> (String, Option<u64>, String) {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let Some(end) = stem.rfind(|c: char| c.is_ascii_digit()).map(|i| i + 1) else {
        return (stem.to_string(), None, String::new());
    };
    let start = stem[..end]
        .char_indices()
        .rev()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(0, |(i, c)| i + c.len_utf8());
    (
        stem[..start].to_string(),
        stem[start..end].parse().ok(),
        stem[end..].to_string(),
    )
}

/// Reads one image file as an 8-bit grayscale `[row, column]` array.
pub fn load_frame(path: &Path) -> anyhow::Result<Array2<u8>> {
    let image = image::open(path)
        .with_context(|| format!("decoding frame {}", path.display()))?
        .to_luma8();
    let (width, height) = image.dimensions();
    Array2::from_shape_vec((height as usize, width as usize), image.into_raw())
        .with_context(|| format!("reshaping frame {}", path.display()))
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64).round() as u8
}

fn page_to_gray(color: ColorType, page: DecodingResult) -> anyhow::Result<Vec<u8>> {
    let gray = match (color, page) {
        (ColorType::Gray(8), DecodingResult::U8(buf)) => buf,
        (ColorType::Gray(16), DecodingResult::U16(buf)) => {
            buf.into_iter().map(|value| (value >> 8) as u8).collect()
        }
        (ColorType::RGB(8), DecodingResult::U8(buf)) => buf
            .chunks_exact(3)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect(),
        (ColorType::RGBA(8), DecodingResult::U8(buf)) => buf
            .chunks_exact(4)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect(),
        (color, _) => bail!("unsupported TIFF sample layout {:?}", color),
    };
    Ok(gray)
}

/// Reads every page of a (multi-page) TIFF file, one frame per page.
pub fn load_tiff_stack(path: &Path) -> anyhow::Result<Vec<Array2<u8>>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .with_context(|| format!("reading TIFF header of {}", path.display()))?;

    let mut frames = Vec::new();
    loop {
        let page = frames.len();
        let (width, height) = decoder
            .dimensions()
            .with_context(|| format!("reading size of page {} in {}", page, path.display()))?;
        let color = decoder
            .colortype()
            .with_context(|| format!("reading colour type of page {} in {}", page, path.display()))?;
        let data = decoder
            .read_image()
            .with_context(|| format!("decoding page {} of {}", page, path.display()))?;
        let gray = page_to_gray(color, data)
            .with_context(|| format!("converting page {} of {}", page, path.display()))?;
        frames.push(
            Array2::from_shape_vec((height as usize, width as usize), gray)
                .with_context(|| format!("reshaping page {} of {}", page, path.display()))?,
        );

        if !decoder.more_images() {
            break;
        }
        decoder
            .next_image()
            .with_context(|| format!("seeking page {} of {}", page + 1, path.display()))?;
    }

    log::info!("loaded {} pages from {}", frames.len(), path.display());
    Ok(frames)
}

/// Loads every PNG/TIFF file in `dir`, in natural file-name order.
pub fn load_frame_dir<P: AsRef<Path>>(dir: P) -> anyhow::Result<Vec<Array2<u8>>> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("listing frame directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && is_frame_file(path))
        .collect();
    if paths.is_empty() {
        bail!("no PNG or TIFF frames found in {}", dir.display());
    }
    paths.sort_by_cached_key(|path| (frame_order_key(path), path.clone()));

    log::info!("loading {} frames from {}", paths.len(), dir.display());
    paths.iter().map(|path| load_frame(path)).collect()
}

/// Loads a frame directory, a multi-page TIFF, or a single image.
pub fn load_frames(path: &Path) -> anyhow::Result<Vec<Array2<u8>>> {
    if path.is_dir() {
        return load_frame_dir(path);
    }
    ensure!(
        is_frame_file(path),
        "{} is neither a frame directory nor a PNG/TIFF file",
        path.display()
    );
    if is_tiff(path) {
        load_tiff_stack(path)
    } else {
        Ok(vec![load_frame(path)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use tiff::encoder::{colortype, TiffEncoder};

    fn lit_column(frame: &Array2<u8>) -> usize {
        frame.row(0).iter().position(|&value| value == 255).unwrap()
    }

    #[test]
    fn frames_load_in_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, lit) in [("frame_001.png", (2, 1)), ("frame_000.png", (0, 3))] {
            let mut img = GrayImage::new(4, 5);
            img.put_pixel(lit.0, lit.1, Luma([255]));
            img.save(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let frames = load_frame_dir(dir.path()).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].dim(), (5, 4));
        assert_eq!(frames[0][[3, 0]], 255);
        assert_eq!(frames[1][[1, 2]], 255);
    }

    #[test]
    fn unpadded_frame_numbers_load_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        for index in [10u32, 2, 1] {
            let mut img = GrayImage::new(12, 1);
            img.put_pixel(index, 0, Luma([255]));
            img.save(dir.path().join(format!("frame_{}.png", index))).unwrap();
        }

        let frames = load_frame_dir(dir.path()).unwrap();
        let order: Vec<usize> = frames.iter().map(lit_column).collect();
        assert_eq!(order, vec![1, 2, 10]);
    }

    #[test]
    fn order_key_splits_on_last_digit_run() {
        assert_eq!(
            frame_order_key(Path::new("run3_frame_0042.png")),
            ("run3_frame_".to_string(), Some(42), String::new())
        );
        assert_eq!(
            frame_order_key(Path::new("background.png")),
            ("background".to_string(), None, String::new())
        );
    }

    #[test]
    fn multi_page_tiff_loads_every_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.tif");
        {
            let mut file = File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(&mut file).unwrap();
            for index in 0..3usize {
                let mut page = vec![0u8; 6 * 2];
                page[index] = 255;
                encoder
                    .write_image::<colortype::Gray8>(6, 2, &page)
                    .unwrap();
            }
        }

        let frames = load_frames(&path).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|frame| frame.dim() == (2, 6)));
        let order: Vec<usize> = frames.iter().map(lit_column).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn single_png_loads_as_one_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("only.png");
        GrayImage::new(3, 2).save(&path).unwrap();
        let frames = load_frames(&path).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].dim(), (2, 3));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_frame_dir(dir.path()).is_err());
        assert!(load_frames(&dir.path().join("notes.txt")).is_err());
    }
}
