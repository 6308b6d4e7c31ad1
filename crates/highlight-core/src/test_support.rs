//! In-memory PDF fixtures for unit tests

use lopdf::encryption::{decrypt_object, get_encryption_key};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// Every glyph of the default `/F1` font advances half an em.
pub(crate) const F1_GLYPH_WIDTH: i64 = 500;

pub(crate) struct FormSpec {
    name: String,
    matrix: Option<[f64; 6]>,
    content: String,
}

pub(crate) struct Type0Spec {
    name: String,
    to_unicode: String,
    default_width: i64,
}

#[derive(Default)]
pub(crate) struct PageSpec {
    media_box: Option<[f64; 4]>,
    crop_box: Option<[f64; 4]>,
    rotate: Option<i64>,
    contents: Vec<String>,
    forms: Vec<FormSpec>,
    type0_fonts: Vec<Type0Spec>,
    resources_by_reference: bool,
}

impl PageSpec {
    pub(crate) fn media_box(mut self, media_box: [f64; 4]) -> Self {
        self.media_box = Some(media_box);
        self
    }

    pub(crate) fn crop_box(mut self, crop_box: [f64; 4]) -> Self {
        self.crop_box = Some(crop_box);
        self
    }

    pub(crate) fn rotate(mut self, degrees: i64) -> Self {
        self.rotate = Some(degrees);
        self
    }

    /// Add one content stream; several calls produce a `/Contents` array.
    pub(crate) fn content(mut self, ops: &str) -> Self {
        self.contents.push(ops.to_string());
        self
    }

    pub(crate) fn form(mut self, name: &str, matrix: Option<[f64; 6]>, content: &str) -> Self {
        self.forms.push(FormSpec {
            name: name.to_string(),
            matrix,
            content: content.to_string(),
        });
        self
    }

    pub(crate) fn type0_font(mut self, name: &str, to_unicode: &str, default_width: i64) -> Self {
        self.type0_fonts.push(Type0Spec {
            name: name.to_string(),
            to_unicode: to_unicode.to_string(),
            default_width,
        });
        self
    }

    pub(crate) fn resources_by_reference(mut self) -> Self {
        self.resources_by_reference = true;
        self
    }
}

#[derive(Default)]
pub(crate) struct PdfBuilder {
    pages: Vec<PageSpec>,
    inherited_media_box: Option<[f64; 4]>,
    user_password: Option<String>,
}

fn reals(values: &[f64]) -> Object {
    Object::Array(values.iter().map(|v| Object::Real(*v as f32)).collect())
}

impl PdfBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, configure: impl FnOnce(PageSpec) -> PageSpec) -> Self {
        self.pages.push(configure(PageSpec::default()));
        self
    }

    /// Put the MediaBox on the `/Pages` node instead of on each page.
    pub(crate) fn inherited_media_box(mut self, media_box: [f64; 4]) -> Self {
        self.inherited_media_box = Some(media_box);
        self
    }

    /// RC4 (revision 2, 40-bit) encryption opened by `user_password`.
    pub(crate) fn encrypted(mut self, user_password: &str) -> Self {
        self.user_password = Some(user_password.to_string());
        self
    }

    fn helvetica(doc: &mut Document) -> ObjectId {
        let widths: Vec<Object> = (32..=126)
            .map(|_| Object::Integer(F1_GLYPH_WIDTH))
            .collect();
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => 32,
            "LastChar" => 126,
            "Widths" => widths,
        })
    }

    fn type0(doc: &mut Document, spec: &Type0Spec) -> ObjectId {
        let cmap_id = doc.add_object(Stream::new(
            Dictionary::new(),
            spec.to_unicode.clone().into_bytes(),
        ));
        let descendant_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => "Embedded",
            "DW" => spec.default_width,
        });
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Embedded",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(descendant_id)],
            "ToUnicode" => Object::Reference(cmap_id),
        })
    }

    pub(crate) fn build_document(self) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let f1_id = Self::helvetica(&mut doc);

        let mut kids = Vec::new();
        for spec in &self.pages {
            let mut fonts = dictionary! { "F1" => Object::Reference(f1_id) };
            for font in &spec.type0_fonts {
                let font_id = Self::type0(&mut doc, font);
                fonts.set(font.name.as_str(), Object::Reference(font_id));
            }

            let mut xobjects = Dictionary::new();
            for form in &spec.forms {
                let mut dict = dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => reals(&[0.0, 0.0, 1000.0, 1000.0]),
                };
                if let Some(matrix) = form.matrix {
                    dict.set("Matrix", reals(&matrix));
                }
                let form_id =
                    doc.add_object(Stream::new(dict, form.content.clone().into_bytes()));
                xobjects.set(form.name.as_str(), Object::Reference(form_id));
            }

            let resources = dictionary! {
                "Font" => fonts,
                "XObject" => xobjects,
            };
            let resources = if spec.resources_by_reference {
                Object::Reference(doc.add_object(resources))
            } else {
                Object::Dictionary(resources)
            };

            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "Resources" => resources,
            };

            match (spec.media_box, self.inherited_media_box) {
                (Some(media_box), _) => page.set("MediaBox", reals(&media_box)),
                (None, None) => page.set("MediaBox", reals(&[0.0, 0.0, 612.0, 792.0])),
                (None, Some(_)) => {}
            }
            if let Some(crop_box) = spec.crop_box {
                page.set("CropBox", reals(&crop_box));
            }
            if let Some(rotate) = spec.rotate {
                page.set("Rotate", rotate);
            }

            let content_ids: Vec<Object> = spec
                .contents
                .iter()
                .map(|ops| {
                    Object::Reference(
                        doc.add_object(Stream::new(Dictionary::new(), ops.clone().into_bytes())),
                    )
                })
                .collect();
            match content_ids.len() {
                0 => {}
                1 => page.set("Contents", content_ids[0].clone()),
                _ => page.set("Contents", Object::Array(content_ids)),
            }

            kids.push(Object::Reference(doc.add_object(page)));
        }

        let mut pages = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        };
        if let Some(media_box) = self.inherited_media_box {
            pages.set("MediaBox", reals(&media_box));
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        if let Some(password) = &self.user_password {
            encrypt(&mut doc, password);
        }

        doc
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut doc = self.build_document();
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}

/// Padding of the standard security handler's password hashing.
const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

const FILE_ID: [u8; 16] = *b"highlight-core-1";

fn hex_string(bytes: Vec<u8>) -> Object {
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut state: Vec<u8> = (0..=255).collect();
    let mut j = 0u8;
    for i in 0..256 {
        j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
        state.swap(i, usize::from(j));
    }

    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(state[usize::from(i)]);
            state.swap(usize::from(i), usize::from(j));
            let k = state[usize::from(state[usize::from(i)].wrapping_add(state[usize::from(j)]))];
            byte ^ k
        })
        .collect()
}

/// Encrypt every stream and string object in place.
///
/// RC4 is symmetric, so lopdf's per-object decryption doubles as encryption.
fn encrypt(doc: &mut Document, user_password: &str) {
    doc.trailer.set(
        "ID",
        vec![hex_string(FILE_ID.to_vec()), hex_string(FILE_ID.to_vec())],
    );
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "Length" => 40,
        "O" => hex_string(vec![0x4F; 32]),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", Object::Reference(encrypt_id));

    let key = get_encryption_key(doc, user_password, false).unwrap();
    let encrypted: Vec<(ObjectId, Vec<u8>)> = doc
        .objects
        .iter()
        .filter(|(id, _)| **id != encrypt_id)
        .filter_map(|(id, obj)| decrypt_object(&key, *id, obj).ok().map(|c| (*id, c)))
        .collect();
    for (id, content) in encrypted {
        match doc.objects.get_mut(&id) {
            Some(Object::Stream(stream)) => stream.set_content(content),
            Some(Object::String(bytes, _)) => *bytes = content,
            _ => {}
        }
    }

    let user_hash = rc4(&key, &PASSWORD_PAD);
    if let Ok(dict) = doc.get_object_mut(encrypt_id).and_then(Object::as_dict_mut) {
        dict.set("U", hex_string(user_hash));
    }
}

/// A ToUnicode CMap mapping each listed two-byte code to one character.
pub(crate) fn to_unicode_cmap(mappings: &[(u16, char)]) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );
    cmap.push_str(&format!("{} beginbfchar\n", mappings.len()));
    for (code, ch) in mappings {
        cmap.push_str(&format!("<{:04X}> <{:04X}>\n", code, *ch as u32));
    }
    cmap.push_str("endbfchar\nendcmap\nend\nend\n");
    cmap
}
