//! Binary little-endian PLY reader/writer for quad (or triangle) meshes.
//!
//! The header is line oriented text terminated by `end_header`; the vertex
//! and face blocks follow immediately. The vertex packet layout is built
//! from the order of the `property` lines, so position, normal and color
//! groups may appear in any order relative to each other.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use rayon::prelude::*;

use crate::error::{IngestError, IngestResult};
use crate::mesh::{DEFAULT_COLOR, DEFAULT_NORMAL, DEFAULT_POSITION, MeshData};

const POSITION_NAMES: [&str; 4] = ["x", "y", "z", "w"];
const NORMAL_NAMES: [&str; 3] = ["nx", "ny", "nz"];
const COLOR_NAMES: [&str; 4] = ["red", "green", "blue", "alpha"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Element {
    Vertex,
    Face,
}

/// Vertex attribute group, in the order it appears in a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attribute {
    Position,
    Normal,
    Color,
}

impl Attribute {
    fn component_bytes(self) -> usize {
        match self {
            Attribute::Position | Attribute::Normal => 4,
            Attribute::Color => 1,
        }
    }

    fn accepts_type(self, ty: &str) -> bool {
        match self {
            Attribute::Position | Attribute::Normal => matches!(ty, "float" | "float32"),
            Attribute::Color => matches!(ty, "uchar" | "uint8"),
        }
    }
}

/// Byte layout of one vertex packet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexLayout {
    pub position_dims: usize,
    pub normal_dims: usize,
    pub color_dims: usize,
    order: Vec<Attribute>,
}

impl VertexLayout {
    pub fn dims(&self, attr: Attribute) -> usize {
        match attr {
            Attribute::Position => self.position_dims,
            Attribute::Normal => self.normal_dims,
            Attribute::Color => self.color_dims,
        }
    }

    fn dims_mut(&mut self, attr: Attribute) -> &mut usize {
        match attr {
            Attribute::Position => &mut self.position_dims,
            Attribute::Normal => &mut self.normal_dims,
            Attribute::Color => &mut self.color_dims,
        }
    }

    pub fn width(&self, attr: Attribute) -> usize {
        self.dims(attr) * attr.component_bytes()
    }

    /// Byte offset of `attr` inside a packet, if the attribute is present.
    pub fn offset(&self, attr: Attribute) -> Option<usize> {
        let mut offset = 0;
        for &a in &self.order {
            if a == attr {
                return Some(offset);
            }
            offset += self.width(a);
        }
        None
    }

    pub fn packet_size(&self) -> usize {
        self.order.iter().map(|&a| self.width(a)).sum()
    }

    fn push_property(&mut self, ty: &str, name: &str, previous: Option<&str>) -> IngestResult<()> {
        let (attr, names): (Attribute, &[&str]) = if POSITION_NAMES.contains(&name) {
            (Attribute::Position, &POSITION_NAMES[..])
        } else if NORMAL_NAMES.contains(&name) {
            (Attribute::Normal, &NORMAL_NAMES[..])
        } else if COLOR_NAMES.contains(&name) {
            (Attribute::Color, &COLOR_NAMES[..])
        } else {
            return Err(format_err(format!("unsupported vertex property '{name}'")));
        };

        if !attr.accepts_type(ty) {
            return Err(format_err(format!(
                "vertex property '{name}' has unsupported type '{ty}'"
            )));
        }

        let index = names.iter().position(|&n| n == name).unwrap_or_default();
        let dims = self.dims(attr);
        if index == 0 {
            if dims != 0 {
                return Err(format_err(format!("vertex property '{name}' declared twice")));
            }
            self.order.push(attr);
        } else if dims != index || previous != Some(names[index - 1]) {
            return Err(format_err(format!(
                "properties should follow {} order, '{name}' is out of place",
                names.join(", ")
            )));
        }
        *self.dims_mut(attr) = index + 1;
        Ok(())
    }
}

/// Everything the header declares.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlyHeader {
    pub comments: Vec<String>,
    pub obj_info: Vec<String>,
    pub vertex_count: usize,
    pub face_count: usize,
    pub layout: VertexLayout,
    /// Byte offset of the first byte after the `end_header` line.
    pub body_offset: usize,
    has_face_list: bool,
}

impl PlyHeader {
    fn parse_property<'a>(
        &mut self,
        element: Option<Element>,
        last_property: &mut Option<String>,
        mut tokens: impl Iterator<Item = &'a str>,
    ) -> IngestResult<()> {
        let ty = tokens
            .next()
            .ok_or_else(|| format_err("property line without a type"))?;

        if ty == "list" {
            let count_ty = tokens.next().unwrap_or_default();
            let index_ty = tokens.next().unwrap_or_default();
            let name = tokens.next().unwrap_or_default();
            if element != Some(Element::Face) {
                return Err(format_err(format!(
                    "list property '{name}' is only supported on the face element"
                )));
            }
            if !matches!(count_ty, "uchar" | "uint8") {
                return Err(format_err(format!("unsupported list count type '{count_ty}'")));
            }
            if !matches!(index_ty, "int" | "int32" | "uint" | "uint32") {
                return Err(format_err(format!("unsupported face index type '{index_ty}'")));
            }
            if self.has_face_list {
                return Err(format_err("face element declares more than one index list"));
            }
            self.has_face_list = true;
            *last_property = Some(name.to_owned());
            return Ok(());
        }

        let name = tokens
            .next()
            .ok_or_else(|| format_err(format!("property of type '{ty}' without a name")))?;
        match element {
            None => {
                return Err(format_err(format!("property '{name}' declared before any element")));
            }
            Some(Element::Face) => {
                return Err(format_err(format!(
                    "unsupported face property '{name}', expected an index list"
                )));
            }
            Some(Element::Vertex) => {
                self.layout.push_property(ty, name, last_property.as_deref())?;
            }
        }
        *last_property = Some(name.to_owned());
        Ok(())
    }
}

#[inline]
fn format_err(msg: impl Into<String>) -> IngestError {
    IngestError::Format(msg.into())
}

/// Next `\n`-terminated line starting at `offset` (without the terminator),
/// and the offset just past it.
fn next_line(bytes: &[u8], offset: usize) -> Option<(&[u8], usize)> {
    let rest = bytes.get(offset..).filter(|r| !r.is_empty())?;
    match rest.iter().position(|&b| b == b'\n') {
        Some(end) => Some((&rest[..end], offset + end + 1)),
        None => Some((rest, bytes.len())),
    }
}

/// Text after `keyword` and its single separator, otherwise verbatim.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> &'a str {
    let rest = line.trim_start().strip_prefix(keyword).unwrap_or_default();
    rest.strip_prefix([' ', '\t']).unwrap_or(rest)
}

/// Parse the text header at the start of `bytes`.
pub fn parse_header(bytes: &[u8]) -> IngestResult<PlyHeader> {
    let mut header = PlyHeader::default();
    let mut element: Option<Element> = None;
    let mut last_property: Option<String> = None;
    let mut offset = 0;
    let mut line_no = 0;

    loop {
        let (raw, next) = next_line(bytes, offset)
            .ok_or_else(|| format_err("header is not terminated by end_header"))?;
        offset = next;
        line_no += 1;

        let line = std::str::from_utf8(raw)
            .map_err(|_| format_err(format!("header line {line_no} is not valid UTF-8")))?
            .trim_end_matches('\r');
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            None | Some("ply") | Some("PLY") => {}
            Some("comment") => header.comments.push(strip_keyword(line, "comment").to_owned()),
            Some("obj_info") => header.obj_info.push(strip_keyword(line, "obj_info").to_owned()),
            Some("format") => {
                let fmt = tokens.next().unwrap_or_default();
                if fmt != "binary_little_endian" {
                    return Err(format_err(format!(
                        "only binary_little_endian PLY files are supported, found '{fmt}'"
                    )));
                }
            }
            Some("element") => {
                let name = tokens.next().unwrap_or_default();
                let count = tokens
                    .next()
                    .and_then(|c| c.parse::<usize>().ok())
                    .ok_or_else(|| {
                        format_err(format!("element '{name}' on line {line_no} has no valid count"))
                    })?;
                element = Some(match name {
                    "vertex" => {
                        header.vertex_count = count;
                        Element::Vertex
                    }
                    "face" => {
                        header.face_count = count;
                        Element::Face
                    }
                    other => return Err(format_err(format!("unsupported element '{other}'"))),
                });
            }
            Some("property") => header.parse_property(element, &mut last_property, tokens)?,
            Some("end_header") => {
                header.body_offset = offset;
                break;
            }
            Some(other) => {
                return Err(format_err(format!(
                    "unrecognised header keyword '{other}' on line {line_no}"
                )));
            }
        }
    }

    if header.vertex_count == 0 {
        return Err(format_err("mesh declares no vertices"));
    }
    if header.layout.position_dims == 0 {
        return Err(format_err("mesh declares no position properties"));
    }
    if header.face_count > 0 && !header.has_face_list {
        return Err(format_err("face element has no vertex index list"));
    }
    Ok(header)
}

fn copy_f32s(dst: &mut [f32], src: &[u8]) {
    for (d, b) in dst.iter_mut().zip(src.chunks_exact(4)) {
        *d = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    }
}

fn decode_vertices(header: &PlyHeader, block: &[u8], mesh: &mut MeshData) {
    let layout = &header.layout;
    let packet = layout.packet_size();
    let n = header.vertex_count;

    let attribute_range = |attr: Attribute| {
        layout
            .offset(attr)
            .map(|start| start..start + layout.width(attr))
    };

    if let Some(range) = attribute_range(Attribute::Position) {
        let dims = layout.position_dims;
        mesh.positions = vec![DEFAULT_POSITION; n];
        mesh.positions
            .par_iter_mut()
            .zip(block.par_chunks_exact(packet))
            .for_each(|(dst, p)| copy_f32s(&mut dst[..dims], &p[range.clone()]));
    }

    if let Some(range) = attribute_range(Attribute::Normal) {
        let dims = layout.normal_dims;
        mesh.normals = vec![DEFAULT_NORMAL; n];
        mesh.normals
            .par_iter_mut()
            .zip(block.par_chunks_exact(packet))
            .for_each(|(dst, p)| copy_f32s(&mut dst[..dims], &p[range.clone()]));
    }

    if let Some(range) = attribute_range(Attribute::Color) {
        let dims = layout.color_dims;
        mesh.colors = vec![DEFAULT_COLOR; n];
        mesh.colors
            .par_iter_mut()
            .zip(block.par_chunks_exact(packet))
            .for_each(|(dst, p)| dst[..dims].copy_from_slice(&p[range.clone()]));
    }
}

/// Decode the face block. Returns the flat index buffer and the stride.
fn decode_faces(block: &[u8], declared: usize) -> IngestResult<(Vec<u32>, usize)> {
    if declared == 0 {
        return Ok((Vec::new(), 0));
    }
    let Some(&first) = block.first() else {
        log::warn!("PLY declares {declared} faces but the file ends after the vertex block");
        return Ok((Vec::new(), 0));
    };

    let stride = first as usize;
    if stride != 3 && stride != 4 {
        return Err(IngestError::CorruptAsset(format!(
            "face with {stride} vertices, only triangles and quads are supported"
        )));
    }

    let packet = 1 + stride * 4;
    let available = block.len() / packet;
    let count = declared.min(available);
    if count < declared {
        log::warn!(
            "PLY declares {declared} faces but only {count} fit in the file, dropping {}",
            declared - count
        );
    } else if available > declared {
        log::debug!("Ignoring {} bytes after the last declared face", block.len() - declared * packet);
    }

    let packets = &block[..count * packet];
    if let Some(face) = packets.chunks_exact(packet).position(|p| p[0] as usize != stride) {
        return Err(format_err(format!(
            "mixed face stride: face {face} has {} vertices, expected {stride}",
            packets[face * packet]
        )));
    }

    let mut indices = vec![0u32; count * stride];
    indices
        .par_chunks_exact_mut(stride)
        .zip(packets.par_chunks_exact(packet))
        .for_each(|(dst, p)| {
            for (d, b) in dst.iter_mut().zip(p[1..].chunks_exact(4)) {
                *d = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            }
        });
    Ok((indices, stride))
}

/// Parse a complete PLY file held in memory.
pub fn parse_ply(bytes: &[u8]) -> IngestResult<(PlyHeader, MeshData)> {
    let header = parse_header(bytes)?;
    let body = &bytes[header.body_offset..];

    let vertex_bytes = header
        .layout
        .packet_size()
        .checked_mul(header.vertex_count)
        .ok_or_else(|| IngestError::CorruptAsset("vertex block size overflows".into()))?;
    if body.len() < vertex_bytes {
        return Err(IngestError::CorruptAsset(format!(
            "vertex block needs {vertex_bytes} bytes but only {} remain",
            body.len()
        )));
    }

    let mut mesh = MeshData::default();
    decode_vertices(&header, &body[..vertex_bytes], &mut mesh);

    let (indices, stride) = decode_faces(&body[vertex_bytes..], header.face_count)?;
    mesh.indices = indices;
    mesh.polygon_stride = stride;
    mesh.validate()?;

    Ok((header, mesh))
}

/// Load a PLY mesh from an in-memory buffer.
pub fn load_ply_from_bytes(bytes: &[u8]) -> IngestResult<MeshData> {
    parse_ply(bytes).map(|(_, mesh)| mesh)
}

/// Load a PLY mesh from a file path.
pub fn load_ply_from_path(path: impl AsRef<Path>) -> IngestResult<MeshData> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| IngestError::io(path, e))?;
    let (header, mesh) = parse_ply(&bytes)?;
    log::info!(
        "Loaded {:?}: {} vertices, {} faces (stride {}), {} comment lines",
        path,
        mesh.vertex_count(),
        mesh.face_count(),
        mesh.polygon_stride,
        header.comments.len()
    );
    Ok(mesh)
}

/// Write `mesh` in the dialect [`parse_ply`] reads.
pub fn write_ply<W: Write>(mesh: &MeshData, mut w: W) -> io::Result<()> {
    let with_w = mesh.positions.iter().any(|p| p[3] != 1.0);
    let position_dims = if with_w { 4 } else { 3 };

    writeln!(w, "ply")?;
    writeln!(w, "format binary_little_endian 1.0")?;
    writeln!(w, "element vertex {}", mesh.vertex_count())?;
    for name in &POSITION_NAMES[..position_dims] {
        writeln!(w, "property float {name}")?;
    }
    if mesh.has_normals() {
        for name in NORMAL_NAMES {
            writeln!(w, "property float {name}")?;
        }
    }
    if mesh.has_colors() {
        for name in COLOR_NAMES {
            writeln!(w, "property uchar {name}")?;
        }
    }
    writeln!(w, "element face {}", mesh.face_count())?;
    writeln!(w, "property list uchar int vertex_indices")?;
    writeln!(w, "end_header")?;

    for i in 0..mesh.vertex_count() {
        for c in &mesh.positions[i][..position_dims] {
            w.write_all(&c.to_le_bytes())?;
        }
        if mesh.has_normals() {
            for c in &mesh.normals[i][..3] {
                w.write_all(&c.to_le_bytes())?;
            }
        }
        if mesh.has_colors() {
            w.write_all(&mesh.colors[i])?;
        }
    }
    if mesh.face_count() > 0 {
        for face in mesh.faces() {
            w.write_all(&[face.len() as u8])?;
            for idx in face {
                w.write_all(&idx.to_le_bytes())?;
            }
        }
    }
    Ok(())
}

pub fn save_ply(mesh: &MeshData, path: impl AsRef<Path>) -> IngestResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| IngestError::io(path, e))?;
    let mut w = BufWriter::new(file);
    write_ply(mesh, &mut w)
        .and_then(|_| w.flush())
        .map_err(|e| IngestError::io(path, e))
}
