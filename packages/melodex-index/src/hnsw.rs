use std::{
	fs::File,
	io::{BufReader, BufWriter, Read, Write},
	path::Path,
};

use hnsw_rs::{
	filter::FilterT,
	prelude::{DistL2, Hnsw},
};

use melodex_domain::{AnnHit, ScopeSet};

use crate::{Error, Result, VectorIndex};

const INDEX_MAGIC: [u8; 4] = *b"MDXA";
const INDEX_VERSION: u16 = 1;

/// Graph construction parameters baked into every index file by the offline
/// build job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HnswParams {
	pub max_nb_connection: usize,
	pub ef_construction: usize,
	pub max_layer: usize,
}

impl Default for HnswParams {
	fn default() -> Self {
		Self { max_nb_connection: 24, ef_construction: 400, max_layer: 16 }
	}
}

/// An `hnsw_rs`-backed ANN index over one embedding table. The on-disk file
/// stores raw ids and vectors; the graph is rebuilt at load time.
pub struct HnswIndex {
	hnsw: Hnsw<'static, f32, DistL2>,
	dimension: usize,
	count: usize,
	ef_search: usize,
}

impl std::fmt::Debug for HnswIndex {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HnswIndex")
			.field("dimension", &self.dimension)
			.field("count", &self.count)
			.field("ef_search", &self.ef_search)
			.finish()
	}
}

impl HnswIndex {
	/// Builds an index over `(id, vector)` records. Ids are the embedding
	/// table row ids and must be non-negative.
	pub fn build(
		records: &[(i64, Vec<f32>)],
		dimension: usize,
		params: HnswParams,
		ef_search: usize,
	) -> Result<Self> {
		let hnsw = Hnsw::<f32, DistL2>::new(
			params.max_nb_connection,
			records.len().max(1),
			params.max_layer,
			params.ef_construction,
			DistL2 {},
		);

		for (id, vector) in records {
			if vector.len() != dimension {
				return Err(Error::DimensionMismatch { expected: dimension, found: vector.len() });
			}
			if *id < 0 {
				return Err(Error::InvalidRecord {
					message: format!("Index records must have non-negative ids, got {id}."),
				});
			}

			hnsw.insert_slice((vector.as_slice(), *id as usize));
		}

		Ok(Self { hnsw, dimension, count: records.len(), ef_search: ef_search.max(1) })
	}

	/// Reads an index file (magic, version, dimension, graph parameters,
	/// then `(id, vector)` records) and rebuilds the graph.
	pub fn load(path: &Path, ef_search: usize) -> Result<Self> {
		let file = File::open(path)?;
		let mut reader = BufReader::new(file);
		let mut magic = [0_u8; 4];

		reader.read_exact(&mut magic)?;

		if magic != INDEX_MAGIC {
			return Err(corrupted(path, "invalid magic bytes"));
		}

		let version = read_u16(&mut reader)?;

		if version != INDEX_VERSION {
			return Err(corrupted(path, format!("unsupported version {version}")));
		}

		let dimension = read_u32(&mut reader)? as usize;
		let record_count = read_u32(&mut reader)? as usize;
		let params = HnswParams {
			max_nb_connection: read_u32(&mut reader)? as usize,
			ef_construction: read_u32(&mut reader)? as usize,
			max_layer: read_u32(&mut reader)? as usize,
		};

		if dimension == 0 {
			return Err(corrupted(path, "dimension must be greater than zero"));
		}

		let mut records = Vec::with_capacity(record_count);

		for _ in 0..record_count {
			let id = read_u64(&mut reader)?;
			let id = i64::try_from(id)
				.map_err(|_| corrupted(path, format!("record id {id} does not fit in i64")))?;
			let mut vector = Vec::with_capacity(dimension);

			for _ in 0..dimension {
				vector.push(read_f32(&mut reader)?);
			}

			records.push((id, vector));
		}

		Self::build(&records, dimension, params, ef_search)
	}

	/// Writes the deterministic index file consumed by [`HnswIndex::load`].
	/// Production files come from the offline build job; this writer backs it
	/// and the tests.
	pub fn save(records: &[(i64, Vec<f32>)], dimension: usize, params: HnswParams, path: &Path) -> Result<()> {
		let file = File::create(path)?;
		let mut writer = BufWriter::new(file);

		writer.write_all(&INDEX_MAGIC)?;
		writer.write_all(&INDEX_VERSION.to_le_bytes())?;
		writer.write_all(&(dimension as u32).to_le_bytes())?;
		writer.write_all(&(records.len() as u32).to_le_bytes())?;
		writer.write_all(&(params.max_nb_connection as u32).to_le_bytes())?;
		writer.write_all(&(params.ef_construction as u32).to_le_bytes())?;
		writer.write_all(&(params.max_layer as u32).to_le_bytes())?;

		for (id, vector) in records {
			if vector.len() != dimension {
				return Err(Error::DimensionMismatch { expected: dimension, found: vector.len() });
			}

			writer.write_all(&(*id as u64).to_le_bytes())?;

			for value in vector {
				writer.write_all(&value.to_le_bytes())?;
			}
		}

		writer.flush()?;

		Ok(())
	}

	fn check_query(&self, vector: &[f32]) -> Result<()> {
		if vector.len() != self.dimension {
			return Err(Error::DimensionMismatch {
				expected: self.dimension,
				found: vector.len(),
			});
		}

		Ok(())
	}
}

impl VectorIndex for HnswIndex {
	fn dimension(&self) -> usize {
		self.dimension
	}

	fn len(&self) -> usize {
		self.count
	}

	fn search(&self, vector: &[f32], k: usize) -> Result<Vec<AnnHit>> {
		self.check_query(vector)?;

		if k == 0 || self.count == 0 {
			return Ok(Vec::new());
		}

		let effective_k = k.min(self.count);
		let ef = self.ef_search.max(effective_k);
		let neighbours = self.hnsw.search(vector, effective_k, ef);

		Ok(neighbours
			.into_iter()
			.map(|neighbour| AnnHit::new(neighbour.d_id as i64, neighbour.distance))
			.collect())
	}

	fn search_scoped(&self, vector: &[f32], k: usize, scope: &ScopeSet) -> Result<Vec<AnnHit>> {
		self.check_query(vector)?;

		if k == 0 || self.count == 0 || scope.is_empty() {
			return Ok(Vec::new());
		}

		// The graph filter visits candidates by usize id; negative ids can
		// never have been inserted.
		let allowed: Vec<usize> = {
			let mut ids: Vec<usize> =
				scope.iter().filter(|id| **id >= 0).map(|id| *id as usize).collect();

			ids.sort_unstable();
			ids
		};

		if allowed.is_empty() {
			return Ok(Vec::new());
		}

		let effective_k = k.min(allowed.len()).min(self.count);
		let ef = self.ef_search.max(effective_k);
		let neighbours =
			self.hnsw.search_filter(vector, effective_k, ef, Some(&allowed as &dyn FilterT));

		Ok(neighbours
			.into_iter()
			.map(|neighbour| AnnHit::new(neighbour.d_id as i64, neighbour.distance))
			.collect())
	}
}

fn corrupted(path: &Path, reason: impl Into<String>) -> Error {
	Error::Corrupted { path: path.to_path_buf(), reason: reason.into() }
}

fn read_u16(reader: &mut impl Read) -> Result<u16> {
	let mut buf = [0_u8; 2];

	reader.read_exact(&mut buf)?;

	Ok(u16::from_le_bytes(buf))
}

fn read_u32(reader: &mut impl Read) -> Result<u32> {
	let mut buf = [0_u8; 4];

	reader.read_exact(&mut buf)?;

	Ok(u32::from_le_bytes(buf))
}

fn read_u64(reader: &mut impl Read) -> Result<u64> {
	let mut buf = [0_u8; 8];

	reader.read_exact(&mut buf)?;

	Ok(u64::from_le_bytes(buf))
}

fn read_f32(reader: &mut impl Read) -> Result<f32> {
	let mut buf = [0_u8; 4];

	reader.read_exact(&mut buf)?;

	Ok(f32::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn axis_records() -> Vec<(i64, Vec<f32>)> {
		vec![
			(0, vec![1.0, 0.0, 0.0]),
			(1, vec![0.9, 0.1, 0.0]),
			(2, vec![0.0, 1.0, 0.0]),
			(3, vec![0.0, 0.0, 1.0]),
		]
	}

	fn build_index() -> HnswIndex {
		HnswIndex::build(&axis_records(), 3, HnswParams::default(), 32).expect("build failed")
	}

	#[test]
	fn nearest_neighbour_comes_back_first() {
		let index = build_index();
		let hits = index.search(&[1.0, 0.0, 0.0], 2).expect("search failed");

		assert_eq!(hits[0].id, 0);
		assert!(hits[0].distance < hits[1].distance);
	}

	#[test]
	fn scoped_search_only_returns_allowed_ids() {
		let index = build_index();
		let scope: ScopeSet = [2, 3].into_iter().collect();
		let hits = index.search_scoped(&[1.0, 0.0, 0.0], 4, &scope).expect("search failed");

		assert!(!hits.is_empty());
		assert!(hits.iter().all(|hit| scope.contains(&hit.id)));
	}

	#[test]
	fn empty_scope_yields_no_hits() {
		let index = build_index();
		let hits =
			index.search_scoped(&[1.0, 0.0, 0.0], 4, &ScopeSet::new()).expect("search failed");

		assert!(hits.is_empty());
	}

	#[test]
	fn query_dimension_is_checked() {
		let index = build_index();

		assert!(index.search(&[1.0, 0.0], 2).is_err());
	}

	#[test]
	fn file_round_trip_restores_searchability() {
		let records = axis_records();
		let mut path = std::env::temp_dir();

		path.push(format!("melodex_index_test_{}.ann", std::process::id()));

		HnswIndex::save(&records, 3, HnswParams::default(), &path).expect("save failed");

		let index = HnswIndex::load(&path, 32).expect("load failed");

		std::fs::remove_file(&path).expect("cleanup failed");

		assert_eq!(index.dimension(), 3);
		assert_eq!(index.len(), 4);

		let hits = index.search(&[0.0, 1.0, 0.0], 1).expect("search failed");

		assert_eq!(hits[0].id, 2);
	}
}
