//! Struct-of-arrays encodings of the stop times of a trip and of the points of a shape
//!
//! Absent values use sentinels: `u32::MAX` for times and sequences (the loader keeps sequences
//! in the `i32` range), NaN for coordinates and distances. The rare text fields are sparse.
use crate::grouped::{Packable, Sequenced};
use gtfs_model::{
    GtfsCode, Id, LogicalTime, PickupDropOffType, Shape, ShapePoint, Stop, StopTime,
    TimepointType, Trip,
};
use std::mem::size_of;

const NO_VALUE: u32 = u32::MAX;

fn from_sentinel(v: u32) -> Option<u32> {
    (v != NO_VALUE).then_some(v)
}

fn from_nan32(v: f32) -> Option<f32> {
    (!v.is_nan()).then_some(v)
}

fn from_nan64(v: f64) -> Option<f64> {
    (!v.is_nan()).then_some(v)
}

impl Sequenced for StopTime {
    fn sequence(&self) -> Option<u32> {
        self.stop_sequence
    }
}

impl Sequenced for ShapePoint {
    fn sequence(&self) -> Option<u32> {
        self.sequence
    }
}

/// The stop times of one trip
pub struct StopTimeBlock {
    arrivals: Vec<u32>,
    departures: Vec<u32>,
    stops: Vec<Option<Id<Stop>>>,
    sequences: Vec<u32>,
    pickup_types: Vec<i32>,
    drop_off_types: Vec<i32>,
    timepoints: Vec<i32>,
    distances: Vec<f32>,
    lines: Vec<u64>,
    headsigns: Vec<(u32, Box<str>)>,
}

impl Packable<Id<Trip>> for StopTime {
    type Block = StopTimeBlock;

    fn pack(run: &[Self]) -> StopTimeBlock {
        StopTimeBlock {
            arrivals: run
                .iter()
                .map(|st| st.arrival_time.map_or(NO_VALUE, LogicalTime::seconds))
                .collect(),
            departures: run
                .iter()
                .map(|st| st.departure_time.map_or(NO_VALUE, LogicalTime::seconds))
                .collect(),
            stops: run.iter().map(|st| st.stop_id.clone()).collect(),
            sequences: run
                .iter()
                .map(|st| st.stop_sequence.unwrap_or(NO_VALUE))
                .collect(),
            pickup_types: run.iter().map(|st| st.pickup_type.code()).collect(),
            drop_off_types: run.iter().map(|st| st.drop_off_type.code()).collect(),
            timepoints: run.iter().map(|st| st.timepoint.code()).collect(),
            distances: run
                .iter()
                .map(|st| st.shape_dist_traveled.unwrap_or(f32::NAN))
                .collect(),
            lines: run.iter().map(|st| st.line).collect(),
            headsigns: run
                .iter()
                .enumerate()
                .filter_map(|(i, st)| {
                    st.stop_headsign
                        .as_deref()
                        .map(|h| (i as u32, Box::from(h)))
                })
                .collect(),
        }
    }

    fn unpack(trip_id: &Id<Trip>, block: &StopTimeBlock) -> Vec<Self> {
        let mut headsigns = block.headsigns.iter().peekable();
        (0..block.lines.len())
            .map(|i| {
                let stop_headsign = match headsigns.peek() {
                    Some((at, h)) if *at as usize == i => {
                        let h = h.to_string();
                        headsigns.next();
                        Some(h)
                    }
                    _ => None,
                };
                StopTime {
                    trip_id: trip_id.clone(),
                    arrival_time: from_sentinel(block.arrivals[i]).map(LogicalTime),
                    departure_time: from_sentinel(block.departures[i]).map(LogicalTime),
                    stop_id: block.stops[i].clone(),
                    stop_sequence: from_sentinel(block.sequences[i]),
                    stop_headsign,
                    pickup_type: PickupDropOffType::from_code(block.pickup_types[i]),
                    drop_off_type: PickupDropOffType::from_code(block.drop_off_types[i]),
                    shape_dist_traveled: from_nan32(block.distances[i]),
                    timepoint: TimepointType::from_code(block.timepoints[i]),
                    line: block.lines[i],
                }
            })
            .collect()
    }

    fn block_len(block: &StopTimeBlock) -> usize {
        block.lines.len()
    }

    fn block_bytes(block: &StopTimeBlock) -> usize {
        let n = block.lines.capacity();
        n * (3 * size_of::<u32>()
            + 3 * size_of::<i32>()
            + size_of::<f32>()
            + size_of::<u64>()
            + size_of::<Option<Id<Stop>>>())
            + block
                .headsigns
                .iter()
                .map(|(_, h)| size_of::<(u32, Box<str>)>() + h.len())
                .sum::<usize>()
    }
}

/// The points of one shape
pub struct ShapePointBlock {
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    sequences: Vec<u32>,
    distances: Vec<f32>,
    lines: Vec<u64>,
}

impl Packable<Id<Shape>> for ShapePoint {
    type Block = ShapePointBlock;

    fn pack(run: &[Self]) -> ShapePointBlock {
        ShapePointBlock {
            latitudes: run.iter().map(|p| p.latitude.unwrap_or(f64::NAN)).collect(),
            longitudes: run.iter().map(|p| p.longitude.unwrap_or(f64::NAN)).collect(),
            sequences: run.iter().map(|p| p.sequence.unwrap_or(NO_VALUE)).collect(),
            distances: run
                .iter()
                .map(|p| p.dist_traveled.unwrap_or(f32::NAN))
                .collect(),
            lines: run.iter().map(|p| p.line).collect(),
        }
    }

    fn unpack(shape_id: &Id<Shape>, block: &ShapePointBlock) -> Vec<Self> {
        (0..block.lines.len())
            .map(|i| ShapePoint {
                shape_id: shape_id.clone(),
                latitude: from_nan64(block.latitudes[i]),
                longitude: from_nan64(block.longitudes[i]),
                sequence: from_sentinel(block.sequences[i]),
                dist_traveled: from_nan32(block.distances[i]),
                line: block.lines[i],
            })
            .collect()
    }

    fn block_len(block: &ShapePointBlock) -> usize {
        block.lines.len()
    }

    fn block_bytes(block: &ShapePointBlock) -> usize {
        block.lines.capacity()
            * (2 * size_of::<f64>() + size_of::<u32>() + size_of::<f32>() + size_of::<u64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtfs_model::IdCache;

    #[test]
    fn stop_times_survive_packing() {
        let cache = IdCache::new();
        let trip: Id<Trip> = cache.intern("T1").unwrap();
        let stop_time = |seq: Option<u32>, headsign: Option<&str>| StopTime {
            trip_id: trip.clone(),
            arrival_time: seq.map(|s| LogicalTime(3600 * s)),
            departure_time: None,
            stop_id: cache.intern("S1"),
            stop_sequence: seq,
            stop_headsign: headsign.map(String::from),
            pickup_type: PickupDropOffType::Unknown(7),
            drop_off_type: PickupDropOffType::ArrangeByPhone,
            shape_dist_traveled: seq.map(|s| s as f32 * 1.5),
            timepoint: TimepointType::Approximate,
            line: 10 + seq.unwrap_or(99) as u64,
        };
        let run = vec![
            stop_time(Some(1), None),
            stop_time(Some(2), Some("Centre")),
            stop_time(None, Some("Gare")),
        ];
        let block = StopTime::pack(&run);
        assert_eq!(3, StopTime::block_len(&block));
        assert!(StopTime::block_bytes(&block) > 0);
        let unpacked = StopTime::unpack(&trip, &block);
        assert_eq!(run, unpacked);
        assert!(unpacked[0].trip_id.ptr_eq(&trip));
    }

    #[test]
    fn shape_points_survive_packing() {
        let cache = IdCache::new();
        let shape: Id<Shape> = cache.intern("SH1").unwrap();
        let run = vec![
            ShapePoint {
                shape_id: shape.clone(),
                latitude: Some(48.85),
                longitude: Some(2.35),
                sequence: Some(0),
                dist_traveled: None,
                line: 2,
            },
            ShapePoint {
                shape_id: shape.clone(),
                latitude: None,
                longitude: Some(2.36),
                sequence: Some(1),
                dist_traveled: Some(12.5),
                line: 3,
            },
        ];
        assert_eq!(run, ShapePoint::unpack(&shape, &ShapePoint::pack(&run)));
    }
}
